mod column;
mod ordered;

pub(crate) use column::{MULTI_VALUED_CELL, decode_owner_column};
pub use column::{IndexColumn, owner_column};
pub use ordered::{
    EncodedValue, KEY_FORMAT_VERSION, encode_name_component, encode_value_component,
    split_value_component,
};
