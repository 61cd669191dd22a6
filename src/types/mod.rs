pub mod analysis;
pub mod position;
pub mod price;
pub mod signals;

pub use analysis::*;
pub use position::*;
pub use price::*;
pub use signals::*;
