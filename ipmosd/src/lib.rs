//! On-screen display coordination.
//!
//! The overlay side of the remote is a single consumer: producers (media
//! session, volume session, web handlers) post [`OverlayCommand`]s on an
//! [`OverlayInbox`], and one [`OverlayCoordinator`] thread owns every visible
//! widget. Nothing outside the coordinator reads or writes widget state.

pub mod command;
pub mod coordinator;
pub mod inbox;
pub mod machine;
pub mod surface;
pub mod widget;

pub use command::{ChannelSnapshot, CodecInfo, OverlayCommand, VolumeSnapshot};
pub use coordinator::{CoordinatorOptions, OverlayCoordinator, spawn_coordinator};
pub use inbox::{OverlayInbox, overlay_channel};
pub use machine::{OverlayMachine, OverlayState};
pub use surface::{OverlaySurface, TracingSurface};
pub use widget::{ChannelWidget, VolumeWidget};
