pub mod fetcher;
pub mod poller;
pub mod provider;
pub mod yahoo;

pub use fetcher::QuoteFetcher;
pub use poller::{PublishRetry, QuotePoller};
pub use provider::{MarketDataProvider, OhlcvSample};
