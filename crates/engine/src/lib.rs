pub mod editing;
pub mod error;
pub mod events;
pub mod expr;
pub mod grid;
pub mod history;
pub mod keys;
pub mod navigation;
pub mod paste;
pub mod projection;
pub mod selection;
pub mod sheet;
pub mod store;
pub mod viewport;

pub use editing::{CellEditor, CommitAction, EditSession, OpenTrigger, SegmentMode};
pub use error::{ExprError, SheetError, ValidationError};
pub use events::SheetEvent;
pub use grid::{Coordinate, GridModel, RowRef};
pub use history::{History, HistoryEntry, HistoryKind};
pub use keys::{Key, KeyInput};
pub use navigation::{navigate, NavCommand};
pub use paste::PasteTarget;
pub use projection::{CarryForwardProjector, Projector};
pub use sheet::{Choice, ForecastSheet, KeyOutcome, Prompt, SheetContext};
pub use store::{MemoryStore, MutationOrigin, SheetStore};
pub use viewport::{FocusManager, ScrollIntoView};
