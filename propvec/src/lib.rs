pub use compact::CompactHandler;
pub use compact::CompactedProps;
pub use compact::TrieCompactHandler;
pub use error::Error;
pub use error::Result;
pub use store::PropsVectors;
pub use trie::builder::TrieBuilder;
pub use trie::Trie;

mod compact;
mod error;
mod store;
pub mod trie;

/// количество кодпоинтов юникода; первый адрес за пределами реальных данных
pub const CODE_POINT_LIMIT: u32 = 0x110000;
/// псевдокодпоинт, несущий вектор начального значения
pub const INITIAL_VALUE_CP: u32 = 0x110000;
/// псевдокодпоинт, несущий вектор значения ошибки
pub const ERROR_VALUE_CP: u32 = 0x110001;
/// последний адрес домена таблицы (включительно)
pub const MAX_CP: u32 = 0x110001;
