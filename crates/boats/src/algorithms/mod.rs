pub mod area;
pub mod index;
pub mod labeling;
pub mod morphology;
pub mod polygonize;
pub mod threshold;

pub use area::*;
pub use index::*;
pub use labeling::*;
pub use morphology::*;
pub use polygonize::*;
pub use threshold::*;
