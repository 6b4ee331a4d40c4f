pub mod authorize_handler;
pub mod callback_handler;
pub mod exchange;
pub mod exchange_handler;

pub use authorize_handler::authorize_handler;
pub use callback_handler::callback_handler;
pub use exchange_handler::exchange_handler;
