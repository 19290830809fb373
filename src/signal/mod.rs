// Signal aggregation and position weighting
pub mod aggregator;
pub mod trend;
pub mod weight_allocator;

pub use aggregator::SignalAggregator;
pub use trend::TrendClassifier;
pub use weight_allocator::WeightAllocator;
