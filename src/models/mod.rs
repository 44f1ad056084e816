pub mod city;
pub mod location;
pub mod weather;

pub use city::*;
pub use location::*;
pub use weather::*;
