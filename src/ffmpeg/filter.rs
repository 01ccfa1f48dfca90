//! Audio filter graph construction

/// Builds an ffmpeg audio filter chain (`-af` argument)
///
/// Filters appear in the order they were added, joined by commas.
///
/// ```
/// use audioflow::ffmpeg::FilterChainBuilder;
///
/// let chain = FilterChainBuilder::new()
///     .add_highpass(80)
///     .add_loudnorm(-16.0, -1.0, 7.0)
///     .build();
/// assert_eq!(chain, "highpass=f=80,loudnorm=I=-16.0:TP=-1.0:LRA=7.0");
/// ```
#[derive(Clone, Debug, Default)]
pub struct FilterChainBuilder {
    filters: Vec<String>,
}

impl FilterChainBuilder {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a highpass filter at `hz`
    pub fn add_highpass(mut self, hz: u32) -> Self {
        self.filters.push(format!("highpass=f={}", hz));
        self
    }

    /// Append a lowpass filter at `hz`
    pub fn add_lowpass(mut self, hz: u32) -> Self {
        self.filters.push(format!("lowpass=f={}", hz));
        self
    }

    /// Append EBU R128 loudness normalization
    pub fn add_loudnorm(mut self, target_lufs: f64, true_peak: f64, lra: f64) -> Self {
        self.filters.push(format!(
            "loudnorm=I={:.1}:TP={:.1}:LRA={:.1}",
            target_lufs, true_peak, lra
        ));
        self
    }

    /// Whether no filter has been added
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Render the chain
    pub fn build(&self) -> String {
        self.filters.join(",")
    }
}
