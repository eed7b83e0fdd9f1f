pub mod money;
pub mod receipt;

pub use money::Money;
pub use receipt::{new_id, ProductItem, Receipt};
