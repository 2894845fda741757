pub mod appointment;
pub mod message;
pub mod user;

pub use appointment::{Appointment, AppointmentStatus};
pub use message::StoredMessage;
pub use user::User;
