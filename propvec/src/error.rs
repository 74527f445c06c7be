use thiserror::Error;

/// результат операций построения таблиц
pub type Result<T> = core::result::Result<T, Error>;

/// ошибки построения таблицы свойств
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error
{
    /// некорректный аргумент; таблица не изменена
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// превышена допустимая ёмкость; дальнейшее построение невозможно
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(&'static str),
    /// операция недопустима в текущем состоянии таблицы
    #[error("illegal state: {0}")]
    IllegalState(&'static str),
}
