pub mod balances;
pub mod config;
pub mod http_pool;
pub mod lifecycle;
pub mod market_reader;
pub mod metrics;
pub mod notify;
pub mod odds_source;
pub mod poller;
pub mod rpc;
pub mod trade;
pub mod view;
pub mod wallet;

pub use balances::*;
pub use config::*;
pub use lifecycle::*;
pub use market_reader::*;
pub use metrics::*;
pub use notify::*;
pub use odds_source::*;
pub use poller::*;
pub use rpc::*;
pub use trade::*;
pub use view::*;
pub use wallet::*;
