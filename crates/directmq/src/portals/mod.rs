/// 传输实现

pub mod websocket;

pub use websocket::{connect, router, MessagesType, WebsocketPortal, WebsocketServer};
