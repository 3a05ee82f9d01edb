pub mod clock;
pub mod controller;
pub mod session;

pub use clock::{format_time, PlaybackClock, PlaybackStatus};
pub use controller::{ClockSnapshot, PlaybackController};
pub use session::ClipSession;
