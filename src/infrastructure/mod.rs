pub mod layout_oracle;

pub use layout_oracle::{CancellableOracle, CountingOracle, FnLayoutOracle, LayoutOracle};
