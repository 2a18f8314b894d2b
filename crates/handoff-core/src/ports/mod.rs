//! Ports - 抽象化レイヤー
//!
//! キュー本体が外部から差し替えられるようにしておく境界です。
//! どちらもテストで決定的な値を注入するために使います。

pub mod clock;
pub mod id_generator;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
