//! Wire format of the messages a result cursor consumes and the parameter block it produces.

mod column;
mod param;
pub mod primitive;
mod row;

pub use column::{
    ColumnDescription, ColumnDescriptionTail, parse_row_description, write_row_description,
};
pub use param::{Param, Parameter, encode_param_types, encode_params};
pub use row::{DataRow, write_data_row};
