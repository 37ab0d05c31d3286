//! Persistence seams implemented by `balance_watch_storage`.

mod traits;

pub use traits::*;
