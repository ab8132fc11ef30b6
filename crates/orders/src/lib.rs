//! `tradegate-orders` — order entities and the order status state machine.
//!
//! Pure domain rules only: which transitions are legal, who may cancel when,
//! how totals are computed. Persistence and orchestration live in infra.

pub mod event;
pub mod order;
pub mod status;

pub use event::{OrderEvent, OrderEventType};
pub use order::{CancelOutcome, DeliveryAddress, Order, OrderItem, OrderSide, Shipment};
pub use status::OrderStatus;
