use crate::error::{Error, Result};
use crate::store::PropsVectors;
use crate::trie::builder::TrieBuilder;
use crate::trie::Trie;
use crate::CODE_POINT_LIMIT;

/// обработчик событий компактизации таблицы свойств
pub trait CompactHandler
{
    /// слот вектора начального значения (псевдокодпоинт 0x110000)
    fn set_initial_value_slot(&mut self, slot: u32);

    /// слот вектора значения ошибки (псевдокодпоинт 0x110001)
    fn set_error_value_slot(&mut self, slot: u32);

    /// учёт слотов завершён; total - длина скомпактованного массива в словах.
    /// вызывается ровно один раз, до первой привязки диапазона
    fn start_real_values(&mut self, total: u32) -> Result<()>;

    /// диапазон [start, end] ссылается на вектор значений по слоту slot
    fn bind_range(&mut self, start: u32, end: u32, slot: u32) -> Result<()>;
}

/// обработчик, складывающий привязки диапазонов в two-stage trie.
/// строитель trie открывается лениво - начальное значение trie становится
/// известно только к началу привязки реальных данных
pub struct TrieCompactHandler
{
    builder: Option<TrieBuilder>,
    initial_slot: u32,
    error_slot: u32,
}

impl CompactHandler for TrieCompactHandler
{
    fn set_initial_value_slot(&mut self, slot: u32)
    {
        self.initial_slot = slot;
    }

    fn set_error_value_slot(&mut self, slot: u32)
    {
        self.error_slot = slot;
    }

    fn start_real_values(&mut self, total: u32) -> Result<()>
    {
        // слоты должны адресоваться 16-битным индексом
        if total > 0xFFFF {
            return Err(Error::CapacityExceeded(
                "compacted slot count exceeds the 16-bit index space",
            ));
        }

        // лид-суррогаты как code unit несут свёрнутые смещения; 0 - данных нет
        self.builder = Some(TrieBuilder::new(self.initial_slot, 0, true));

        Ok(())
    }

    fn bind_range(&mut self, start: u32, end: u32, slot: u32) -> Result<()>
    {
        match self.builder.as_mut() {
            Some(builder) => builder.set_range(start, end + 1, slot, true),
            None => Err(Error::IllegalState("bind_range before start_real_values")),
        }
    }
}

impl TrieCompactHandler
{
    pub fn new() -> Self
    {
        Self {
            builder: None,
            initial_slot: 0,
            error_slot: 0,
        }
    }

    /// слот значения ошибки, найденный при компактизации
    pub fn error_slot(&self) -> u32
    {
        self.error_slot
    }

    /// сериализовать построенный trie
    pub fn serialize(self) -> Result<Trie>
    {
        match self.builder {
            Some(builder) => builder.serialize(),
            None => Err(Error::IllegalState("serialize before compaction")),
        }
    }
}

impl Default for TrieCompactHandler
{
    fn default() -> Self
    {
        Self::new()
    }
}

/// итог компактизации: trie, разрешающий адрес в слот, и дедуплицированный
/// массив векторов значений. неизменяем, безопасен для конкурентного чтения
pub struct CompactedProps
{
    pub trie: Trie,
    pub values: Vec<u32>,
    pub columns: usize,
    pub error_slot: u32,
}

impl CompactedProps
{
    /// значение колонки для кодпоинта; за пределами домена - вектор значения ошибки
    #[inline(always)]
    pub fn get(&self, c: u32, column: usize) -> u32
    {
        let slot = match c < CODE_POINT_LIMIT {
            true => self.trie.lookup(c),
            false => self.error_slot,
        };

        self.values[slot as usize + column]
    }
}

impl PropsVectors
{
    /// компактизация с построением trie: таблица потребляется, наружу выходит
    /// неизменяемая пара trie + массив значений
    pub fn compact_to_trie(mut self) -> Result<CompactedProps>
    {
        let mut handler = TrieCompactHandler::new();

        self.compact(&mut handler)?;

        let columns = self.value_columns();
        let error_slot = handler.error_slot();
        let trie = handler.serialize()?;

        Ok(CompactedProps {
            trie,
            values: self.into_values(),
            columns,
            error_slot,
        })
    }
}
