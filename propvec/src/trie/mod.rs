pub mod builder;

/// сдвиг стадии 1: старшие биты кодпоинта выбирают ячейку индекса
pub const SHIFT: u32 = 5;
/// длина блока данных стадии 2
pub const DATA_BLOCK_LENGTH: usize = 1 << SHIFT;
/// маска смещения внутри блока
pub const MASK: u32 = DATA_BLOCK_LENGTH as u32 - 1;
/// сдвиг значений индекса: смещения блоков хранятся в u16, поделённые на гранулярность
pub const INDEX_SHIFT: u32 = 2;
/// гранулярность смещений блоков данных
pub const DATA_GRANULARITY: usize = 1 << INDEX_SHIFT;
/// длина BMP-части индекса
pub const BMP_INDEX_LENGTH: usize = 0x10000 >> SHIFT;
/// ячеек индекса на диапазон одного лид-суррогата (1024 кодпоинта)
pub const SURROGATE_BLOCK_COUNT: usize = 0x400 >> SHIFT;
/// максимальная длина индекса сериализованного trie
pub const MAX_INDEX_LENGTH: usize = 0x8800;
/// максимальная длина данных: смещение после сдвига должно помещаться в u16
pub const MAX_DATA_LENGTH: usize = 0x10000 << INDEX_SHIFT;

/// неизменяемый two-stage trie: индекс (стадия 1) + данные (стадия 2).
/// владеет обоими массивами, безопасен для конкурентного чтения
pub struct Trie
{
    /// стадия 1: смещения блоков данных, поделённые на DATA_GRANULARITY
    index: Vec<u16>,
    /// стадия 2: значения
    data: Vec<u32>,
    /// значение по умолчанию
    initial_value: u32,
}

impl Trie
{
    pub(crate) fn new(index: Vec<u16>, data: Vec<u32>, initial_value: u32) -> Self
    {
        Self {
            index,
            data,
            initial_value,
        }
    }

    /// значение для кодпоинта.
    ///
    /// BMP разрешается напрямую через индекс; лид-суррогаты как кодпоинты -
    /// через скопированный блок индекса за BMP-частью; дополнительные плоскости -
    /// через свёрнутое значение соответствующего лид-суррогата.
    /// за пределами домена - значение по умолчанию
    #[inline(always)]
    pub fn lookup(&self, c: u32) -> u32
    {
        if c < 0xD800 {
            return self.raw((c >> SHIFT) as usize, c);
        }

        if c < 0x10000 {
            let i = match c < 0xDC00 {
                true => BMP_INDEX_LENGTH + ((c as usize - 0xD800) >> SHIFT),
                false => (c >> SHIFT) as usize,
            };

            return self.raw(i, c);
        }

        if c < 0x110000 {
            // свёрнутое значение лид-суррогата: 0 - данных нет,
            // иначе - смещение области индекса для хвостовой части кодпоинта
            let lead = 0xD7C0 + (c >> 10);
            let offset = self.raw((lead >> SHIFT) as usize, lead);

            if offset == 0 {
                return self.initial_value;
            }

            let i = offset as usize + ((c as usize >> SHIFT) & (SURROGATE_BLOCK_COUNT - 1));

            return self.raw(i, c);
        }

        self.initial_value
    }

    /// значение по умолчанию
    #[inline(always)]
    pub fn initial_value(&self) -> u32
    {
        self.initial_value
    }

    /// длина индекса, в ячейках
    pub fn index_length(&self) -> usize
    {
        self.index.len()
    }

    /// длина массива данных, в словах
    pub fn data_length(&self) -> usize
    {
        self.data.len()
    }

    /// чтение по ячейке индекса и младшим битам кодпоинта
    #[inline(always)]
    fn raw(&self, index_pos: usize, c: u32) -> u32
    {
        let block = (self.index[index_pos] as usize) << INDEX_SHIFT;

        self.data[block + (c & MASK) as usize]
    }
}
