use crate::error::{Error, Result};
use crate::CODE_POINT_LIMIT;

use super::{
    Trie, BMP_INDEX_LENGTH, DATA_BLOCK_LENGTH, DATA_GRANULARITY, INDEX_SHIFT, MASK,
    MAX_DATA_LENGTH, MAX_INDEX_LENGTH, SHIFT, SURROGATE_BLOCK_COUNT,
};

/// длина индекса на этапе построения - по ячейке на каждый блок юникода
const BUILD_INDEX_LENGTH: usize = (CODE_POINT_LIMIT as usize) >> SHIFT;
/// предельная длина данных на этапе построения
const BUILD_DATA_CAPACITY: usize = CODE_POINT_LIMIT as usize + 0x400 + DATA_BLOCK_LENGTH;

/// строящийся two-stage trie.
///
/// отрицательная ячейка индекса означает разделяемый блок-повторитель:
/// первая точечная запись в такой блок выделяет копию (copy-on-write).
/// сериализация потребляет строитель - обратного перехода нет
pub struct TrieBuilder
{
    /// стадия 1
    index: Vec<i32>,
    /// стадия 2; длина массива - занятая часть данных
    data: Vec<u32>,
    /// используемая длина индекса
    index_length: usize,
    /// значение по умолчанию
    initial_value: u32,
    /// значение лид-суррогатов как code unit
    lead_unit_value: u32,
    /// Latin-1 хранится линейно в начале данных и не компактизируется
    latin1_linear: bool,
}

impl TrieBuilder
{
    /// новый строитель; все кодпоинты изначально имеют значение initial_value
    pub fn new(initial_value: u32, lead_unit_value: u32, latin1_linear: bool) -> Self
    {
        let mut index = vec![0; BUILD_INDEX_LENGTH];
        let mut data = vec![initial_value; DATA_BLOCK_LENGTH];

        if latin1_linear {
            // U+0000..U+00FF размещаются в последовательных блоках сразу
            // за нулевым блоком
            let mut offset = DATA_BLOCK_LENGTH;

            for cell in index.iter_mut().take(256 >> SHIFT) {
                *cell = offset as i32;
                offset += DATA_BLOCK_LENGTH;
            }

            data.resize(offset, initial_value);
        }

        Self {
            index,
            data,
            index_length: BUILD_INDEX_LENGTH,
            initial_value,
            lead_unit_value,
            latin1_linear,
        }
    }

    /// значение кодпоинта на этапе построения;
    /// за пределами домена - значение по умолчанию
    pub fn get_value(&self, c: u32) -> u32
    {
        if c >= CODE_POINT_LIMIT {
            return self.initial_value;
        }

        let block = self.index[(c >> SHIFT) as usize].unsigned_abs() as usize;

        self.data[block + (c & MASK) as usize]
    }

    /// установить значение для одного кодпоинта
    pub fn set_value(&mut self, c: u32, value: u32) -> Result<()>
    {
        if c >= CODE_POINT_LIMIT {
            return Err(Error::InvalidArgument("code point out of range"));
        }

        let block = self.get_data_block(c)?;
        self.data[block + (c & MASK) as usize] = value;

        Ok(())
    }

    /// установить значение для диапазона [start, limit).
    ///
    /// при overwrite == false значение получают только кодпоинты со значением
    /// по умолчанию. целиком покрытые блоки не выделяются, а ссылаются на общий
    /// блок-повторитель
    pub fn set_range(&mut self, start: u32, limit: u32, value: u32, overwrite: bool) -> Result<()>
    {
        if start > limit || limit > CODE_POINT_LIMIT {
            return Err(Error::InvalidArgument("invalid code point range"));
        }

        if start == limit {
            return Ok(());
        }

        let mut start = start;

        if start & MASK != 0 {
            // частичный блок в начале диапазона
            let block = self.get_data_block(start)?;
            let next_start = (start + DATA_BLOCK_LENGTH as u32) & !MASK;

            match next_start <= limit {
                true => {
                    self.fill_block(block, (start & MASK) as usize, DATA_BLOCK_LENGTH, value, overwrite);
                    start = next_start;
                }
                false => {
                    self.fill_block(block, (start & MASK) as usize, (limit & MASK) as usize, value, overwrite);

                    return Ok(());
                }
            }
        }

        // длина частичного блока в конце диапазона
        let rest = (limit & MASK) as usize;
        let limit = limit & !MASK;

        // для значения по умолчанию блоком-повторителем служит нулевой блок
        let mut repeat_block = match value == self.initial_value {
            true => 0,
            false => -1,
        };

        while start < limit {
            let i = (start >> SHIFT) as usize;
            let block = self.index[i];

            if block > 0 {
                // блок уже выделен - просто заполняем
                self.fill_block(block as usize, 0, DATA_BLOCK_LENGTH, value, overwrite);
            } else if self.data[(-block) as usize] != value && (block == 0 || overwrite) {
                match repeat_block >= 0 {
                    true => self.index[i] = -repeat_block,
                    false => {
                        // создаём и заполняем блок-повторитель
                        let new_block = self.get_data_block(start)?;
                        self.index[i] = -(new_block as i32);
                        self.fill_block(new_block, 0, DATA_BLOCK_LENGTH, value, true);

                        repeat_block = new_block as i32;
                    }
                }
            }

            start += DATA_BLOCK_LENGTH as u32;
        }

        if rest > 0 {
            // частичный блок в конце
            let block = self.get_data_block(start)?;
            self.fill_block(block, 0, rest, value, overwrite);
        }

        Ok(())
    }

    /// сериализация: компактизация без перекрытий (улучшает сворачивание),
    /// сворачивание суррогатной части индекса, повторная компактизация
    /// с перекрытием блоков - минимальная длина данных
    pub fn serialize(mut self) -> Result<Trie>
    {
        self.compact(false);
        self.fold()?;
        self.compact(true);

        if self.data.len() >= MAX_DATA_LENGTH {
            return Err(Error::CapacityExceeded("trie data array too long"));
        }

        tracing::debug!(
            index_length = self.index_length,
            data_length = self.data.len(),
            "serializing two-stage trie"
        );

        let index = self.index[.. self.index_length]
            .iter()
            .map(|&v| ((v as u32) >> INDEX_SHIFT) as u16)
            .collect();

        Ok(Trie::new(index, self.data, self.initial_value))
    }

    /// выделить блок данных в конце массива
    fn alloc_data_block(&mut self) -> Result<usize>
    {
        let new_block = self.data.len();

        if new_block + DATA_BLOCK_LENGTH > BUILD_DATA_CAPACITY {
            return Err(Error::CapacityExceeded("trie data array overflow"));
        }

        self.data.resize(new_block + DATA_BLOCK_LENGTH, self.initial_value);

        Ok(new_block)
    }

    /// блок данных для записи. если блок разделяемый - выделяется его копия,
    /// и ячейка индекса начинает указывать на неё
    fn get_data_block(&mut self, c: u32) -> Result<usize>
    {
        let i = (c >> SHIFT) as usize;
        let index_value = self.index[i];

        if index_value > 0 {
            return Ok(index_value as usize);
        }

        let new_block = self.alloc_data_block()?;
        self.index[i] = new_block as i32;

        let old = index_value.unsigned_abs() as usize;
        self.data.copy_within(old .. old + DATA_BLOCK_LENGTH, new_block);

        Ok(new_block)
    }

    /// заполнить часть блока значением;
    /// при overwrite == false - только ячейки со значением по умолчанию
    fn fill_block(&mut self, block: usize, from: usize, to: usize, value: u32, overwrite: bool)
    {
        let initial = self.initial_value;
        let cells = &mut self.data[block + from .. block + to];

        match overwrite {
            true => cells.fill(value),
            false => cells
                .iter_mut()
                .filter(|cell| **cell == initial)
                .for_each(|cell| *cell = value),
        }
    }

    /// свёрнутое значение для диапазона одного лид-суррогата: смещение offset,
    /// если среди 1024 дополнительных кодпоинтов есть данные, иначе 0 -
    /// "через этот суррогат данные недостижимы"
    fn folded_value(&self, start: u32, offset: usize) -> u32
    {
        let limit = start + 0x400;
        let mut c = start;

        while c < limit {
            let block = self.index[(c >> SHIFT) as usize];

            // нулевой блок пропускаем целиком
            if block == 0 {
                c += DATA_BLOCK_LENGTH as u32;
                continue;
            }

            let value = self.data[block.unsigned_abs() as usize + (c & MASK) as usize];

            if value != self.initial_value {
                return offset as u32;
            }

            c += 1;
        }

        0
    }

    /// сворачивание индекса дополнительных плоскостей.
    ///
    /// индексы лид-суррогатов как кодпоинтов копируются в блок сразу за
    /// BMP-частью, значимые блоки индекса дополнительных плоскостей
    /// переносятся в область за ним, а сами лид-суррогаты как code unit
    /// получают свёрнутые значения - смещения этих блоков
    fn fold(&mut self) -> Result<()>
    {
        let lead_start = (0xD800 >> SHIFT) as usize;
        let lead_indexes: Vec<i32> =
            self.index[lead_start .. lead_start + SURROGATE_BLOCK_COUNT].to_vec();

        // значение лид-суррогатов как code unit: по умолчанию поиск не должен
        // находить данных для дополнительных кодпоинтов
        let mut block = 0;
        if self.lead_unit_value != self.initial_value {
            let new_block = self.alloc_data_block()?;
            self.fill_block(new_block, 0, DATA_BLOCK_LENGTH, self.lead_unit_value, true);

            // отрицательное значение - блок-повторитель
            block = -(new_block as i32);
        }

        for i in (0xD800 >> SHIFT) .. (0xDC00 >> SHIFT) {
            self.index[i as usize] = block;
        }

        // переносим значимые блоки индекса в область сразу за BMP-частью
        let mut index_length = BMP_INDEX_LENGTH;
        let mut c = 0x10000;

        while c < CODE_POINT_LIMIT {
            if self.index[(c >> SHIFT) as usize] == 0 {
                c += DATA_BLOCK_LENGTH as u32;
                continue;
            }

            // есть данные - обрабатываем диапазон лид-суррогата целиком
            c &= !0x3FF;

            let other = (c >> SHIFT) as usize;
            let block = self.find_same_index_block(index_length, other);

            // смещение учитывает блок индексов лид-суррогатов,
            // который будет вставлен перед свёрнутой областью
            let value = self.folded_value(c, block + SURROGATE_BLOCK_COUNT);
            let lead = 0xD7C0 + (c >> 10);

            if value != self.get_value(lead) {
                self.set_value(lead, value)?;

                // идентичного блока не нашлось - переносим индексы на новое место
                if block == index_length {
                    self.index.copy_within(other .. other + SURROGATE_BLOCK_COUNT, index_length);
                    index_length += SURROGATE_BLOCK_COUNT;
                }
            }

            c += 0x400;
        }

        if index_length >= MAX_INDEX_LENGTH {
            return Err(Error::CapacityExceeded("trie index table overflow"));
        }

        // вставляем сохранённые индексы лид-суррогатов между BMP-частью
        // и свёрнутыми блоками
        self.index
            .copy_within(BMP_INDEX_LENGTH .. index_length, BMP_INDEX_LENGTH + SURROGATE_BLOCK_COUNT);

        for (i, value) in lead_indexes.into_iter().enumerate() {
            self.index[BMP_INDEX_LENGTH + i] = value;
        }

        self.index_length = index_length + SURROGATE_BLOCK_COUNT;

        Ok(())
    }

    /// поиск идентичного блока индекса в уже свёрнутой области
    fn find_same_index_block(&self, index_length: usize, other: usize) -> usize
    {
        let mut block = BMP_INDEX_LENGTH;

        while block < index_length {
            if self.index[block .. block + SURROGATE_BLOCK_COUNT]
                == self.index[other .. other + SURROGATE_BLOCK_COUNT]
            {
                return block;
            }

            block += SURROGATE_BLOCK_COUNT;
        }

        index_length
    }

    /// компактизация данных:
    /// - неиспользуемые блоки выбрасываются
    /// - байт-в-байт идентичные блоки сводятся к одному (структурное разделение)
    /// - при overlap == true соседние блоки перекрываются по краям с шагом
    ///   гранулярности
    fn compact(&mut self, overlap: bool)
    {
        // карта перемещений: для каждого блока - новое смещение, -1 у неиспользуемых
        let mut map = vec![-1; (self.data.len() >> SHIFT) + 1];

        for i in 0 .. self.index_length {
            map[(self.index[i].unsigned_abs() as usize) >> SHIFT] = 0;
        }

        // нулевой блок не перемещается
        map[0] = 0;

        // линейная Latin-1 не компактизируется
        let mut overlap_start = DATA_BLOCK_LENGTH;
        if self.latin1_linear {
            overlap_start += 256;
        }

        let mut new_start = DATA_BLOCK_LENGTH;
        let mut start = new_start;

        while start < self.data.len() {
            if map[start >> SHIFT] < 0 {
                start += DATA_BLOCK_LENGTH;
                continue;
            }

            if start >= overlap_start {
                // идентичный блок среди уже уплотнённых?
                let step = match overlap {
                    true => DATA_GRANULARITY,
                    false => DATA_BLOCK_LENGTH,
                };

                if let Some(other) = self.find_same_data_block(new_start, start, step) {
                    map[start >> SHIFT] = other as i32;
                    start += DATA_BLOCK_LENGTH;
                    continue;
                }
            }

            // максимальное перекрытие начала блока с концом предыдущего
            let mut overlapped = 0;
            if overlap && start >= overlap_start {
                overlapped = DATA_BLOCK_LENGTH - DATA_GRANULARITY;

                while overlapped > 0
                    && self.data[new_start - overlapped .. new_start]
                        != self.data[start .. start + overlapped]
                {
                    overlapped -= DATA_GRANULARITY;
                }
            }

            if overlapped > 0 {
                map[start >> SHIFT] = (new_start - overlapped) as i32;

                // переносим только неперекрывающуюся часть
                let mut from = start + overlapped;
                start += DATA_BLOCK_LENGTH;

                while from < start {
                    self.data[new_start] = self.data[from];
                    new_start += 1;
                    from += 1;
                }
            } else if new_start < start {
                // перекрытия нет - блок сдвигается на новое место
                map[start >> SHIFT] = new_start as i32;

                let mut from = start;
                start += DATA_BLOCK_LENGTH;

                while from < start {
                    self.data[new_start] = self.data[from];
                    new_start += 1;
                    from += 1;
                }
            } else {
                // блок уже на месте
                map[start >> SHIFT] = start as i32;
                new_start += DATA_BLOCK_LENGTH;
                start = new_start;
            }
        }

        // обновляем индекс по карте перемещений
        for i in 0 .. self.index_length {
            self.index[i] = map[(self.index[i].unsigned_abs() as usize) >> SHIFT];
        }

        self.data.truncate(new_start);
    }

    /// поиск байт-в-байт идентичного блока среди уже уплотнённых данных
    fn find_same_data_block(&self, data_length: usize, other: usize, step: usize) -> Option<usize>
    {
        if data_length < DATA_BLOCK_LENGTH {
            return None;
        }

        let last = data_length - DATA_BLOCK_LENGTH;
        let mut block = 0;

        while block <= last {
            if self.data[block .. block + DATA_BLOCK_LENGTH]
                == self.data[other .. other + DATA_BLOCK_LENGTH]
            {
                return Some(block);
            }

            block += step;
        }

        None
    }
}
