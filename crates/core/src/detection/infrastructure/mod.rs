pub mod replay_face_detector;
pub mod replay_spoof_scorer;
