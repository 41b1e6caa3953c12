pub mod api_view;
pub mod client;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod poller;
pub mod reconnect;
pub mod transport;
pub mod view;
