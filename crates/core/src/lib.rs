//! Core data types for forecast sheets.
//!
//! Variables and their persisted inputs (time segments, actuals), the
//! month keys they are indexed by, and the derived frames and projections
//! the grid displays.

pub mod expression;
pub mod frame;
pub mod month;
pub mod name;
pub mod variable;

pub use expression::Expression;
pub use frame::{Frame, Projection, SubFrame};
pub use month::{Month, MonthParseError, MonthRange};
pub use name::{validate_name_shape, validate_variable_name, NameError};
pub use variable::{
    Actual, Breakdown, SegmentMethod, TimeSegment, Variable, VariableId, VariableType,
};
