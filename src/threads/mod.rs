//! Thread management.
//!
//! - `LocalizerThread`: receives scan / map / pose events and feeds the
//!   shared [`Localizer`](crate::localizer::Localizer)

mod localizer_thread;

pub use localizer_thread::{
    coalesce, create_event_channel, EventSender, LocalizerEvent, LocalizerThread, ThreadStats,
};
