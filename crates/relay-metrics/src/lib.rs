pub mod history;
pub mod sampler;
pub mod source;

pub use history::{HistoryBuffer, MAX_HISTORY, MetricsHistory, MetricsSample};
pub use sampler::{MetricsSampler, SamplerTask};
pub use source::{CommandSource, MetricsSource, Reading, SystemSource};
