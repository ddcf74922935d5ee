pub mod face_detector;
pub mod spoof_scorer;
