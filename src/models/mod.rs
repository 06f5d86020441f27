pub mod enums;
pub mod history;
pub mod reminder;
pub mod scan;

pub use enums::*;
pub use history::*;
pub use reminder::*;
pub use scan::*;
