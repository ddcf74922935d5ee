use std::fmt;

type ReleaseHook = Box<dyn FnOnce() + Send>;

/// A single camera frame handed to the pipeline: opaque pixel bytes plus the
/// metadata the decision logic needs.
///
/// Camera drivers typically lend frames out of a fixed pool. The optional
/// release hook returns the buffer to its owner and runs exactly once, when
/// the frame is dropped, so every exit path of frame processing gives the
/// buffer back.
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
    timestamp_ms: Option<u64>,
    on_release: Option<ReleaseHook>,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert!(
            data.is_empty()
                || data.len() == (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
            timestamp_ms: None,
            on_release: None,
        }
    }

    /// A frame without pixel payload, for detectors that work from
    /// precomputed results (replays, tests).
    pub fn metadata_only(width: u32, height: u32, index: usize) -> Self {
        Self::new(Vec::new(), width, height, 0, index)
    }

    /// Capture timestamp reported by the camera, in milliseconds.
    pub fn with_timestamp_ms(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }

    pub fn with_release_hook(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_release = Some(Box::new(hook));
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn timestamp_ms(&self) -> Option<u64> {
        self.timestamp_ms
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        if let Some(release) = self.on_release.take() {
            release();
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .field("index", &self.index)
            .field("timestamp_ms", &self.timestamp_ms)
            .field("bytes", &self.data.len())
            .finish()
    }
}
