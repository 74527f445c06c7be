use crate::compact::CompactHandler;
use crate::error::{Error, Result};
use crate::{CODE_POINT_LIMIT, ERROR_VALUE_CP, INITIAL_VALUE_CP, MAX_CP};

/// начальная ёмкость таблицы, в строках
const INITIAL_ROWS: usize = 1 << 10;
/// средняя ёмкость
const MEDIUM_ROWS: usize = 1 << 11;
/// максимальная ёмкость - по строке на каждый адрес домена
const MAX_ROWS: usize = MAX_CP as usize + 1;

/// таблица свойств, ключом которой являются диапазоны кодпоинтов.
///
/// строки хранятся в плоском массиве: start, limit, затем колонки значений.
/// инвариант: строки упорядочены по start, не пересекаются и покрывают весь
/// домен [0, 0x110002) без разрывов - limit каждой строки равен start следующей
pub struct PropsVectors
{
    /// строки таблицы; после компактизации - дедуплицированные векторы значений
    v: Vec<u32>,
    /// полная ширина строки: 2 служебные колонки + колонки значений
    columns: usize,
    /// количество строк
    rows: usize,
    /// последняя найденная строка - кэш для поиска по соседним диапазонам
    prev_row: usize,
    /// таблица скомпактована, мутация запрещена
    is_compacted: bool,
}

impl PropsVectors
{
    /// новая таблица с указанным количеством колонок значений.
    /// изначально весь домен покрыт нулями: одна строка на реальные кодпоинты
    /// и по строке на каждый из двух псевдокодпоинтов
    pub fn new(columns: u32) -> Result<Self>
    {
        if columns < 1 {
            return Err(Error::InvalidArgument("columns must be >= 1"));
        }

        let columns = columns as usize + 2;
        let mut v = vec![0; INITIAL_ROWS * columns];

        v[0] = 0;
        v[1] = CODE_POINT_LIMIT;
        v[columns] = INITIAL_VALUE_CP;
        v[columns + 1] = INITIAL_VALUE_CP + 1;
        v[2 * columns] = ERROR_VALUE_CP;
        v[2 * columns + 1] = ERROR_VALUE_CP + 1;

        Ok(Self {
            v,
            columns,
            rows: 3,
            prev_row: 0,
            is_compacted: false,
        })
    }

    /// количество колонок значений
    #[inline(always)]
    pub fn value_columns(&self) -> usize
    {
        self.columns - 2
    }

    /// текущее количество строк (до компактизации)
    #[inline(always)]
    pub fn rows(&self) -> usize
    {
        self.rows
    }

    #[inline(always)]
    fn start_of(&self, row: usize) -> u32
    {
        self.v[row * self.columns]
    }

    #[inline(always)]
    fn limit_of(&self, row: usize) -> u32
    {
        self.v[row * self.columns + 1]
    }

    /// записать значение с маской во все адреса диапазона [start, end]:
    /// значение колонки становится (old & !mask) | (value & mask).
    /// граничные строки разрезаются только если записываемое значение
    /// действительно меняет их содержимое
    pub fn set_value(&mut self, start: u32, end: u32, column: u32, value: u32, mask: u32) -> Result<()>
    {
        if self.is_compacted {
            return Err(Error::IllegalState("set_value on a compacted table"));
        }

        if start > end || end > MAX_CP {
            return Err(Error::InvalidArgument("start > end or end > 0x110001"));
        }

        if column as usize >= self.value_columns() {
            return Err(Error::InvalidArgument("column index out of range"));
        }

        let columns = self.columns;
        let column = column as usize + 2;
        let limit = end + 1;
        let value = value & mask;

        let mut first_row = self.find_row(start);
        let mut last_row = first_row;

        while limit > self.limit_of(last_row) {
            last_row += 1;
        }

        let split_first = start != self.start_of(first_row)
            && value != self.v[first_row * columns + column] & mask;
        let split_last = limit != self.limit_of(last_row)
            && value != self.v[last_row * columns + column] & mask;

        if split_first || split_last {
            let add = split_first as usize + split_last as usize;

            if self.rows + add > self.v.len() / columns {
                self.grow(self.rows + add)?;
            }

            // сдвигаем хвост таблицы, освобождая место под новые строки
            let tail = (last_row + 1) * columns;
            let tail_len = (self.rows - last_row - 1) * columns;
            self.v.copy_within(tail .. tail + tail_len, tail + add * columns);
            self.rows += add;

            if split_first {
                // строки [first_row ..= last_row] уходят на одну позицию вверх,
                // граница делится ровно по start
                let from = first_row * columns;
                let len = (last_row - first_row + 1) * columns;
                self.v.copy_within(from .. from + len, from + columns);
                last_row += 1;

                self.v[first_row * columns + 1] = start;
                self.v[(first_row + 1) * columns] = start;
                first_row += 1;
            }

            if split_last {
                // копия последней строки, граница делится по limit;
                // значение будет записано в нижнюю половину
                let from = last_row * columns;
                self.v.copy_within(from .. from + columns, from + columns);

                self.v[last_row * columns + 1] = limit;
                self.v[(last_row + 1) * columns] = limit;
            }
        }

        self.prev_row = last_row;

        let mask = !mask;
        for row in first_row ..= last_row {
            let cell = &mut self.v[row * columns + column];
            *cell = (*cell & mask) | value;
        }

        Ok(())
    }

    /// значение колонки для адреса. за пределами домена или после компактизации
    /// возвращается нулевое значение, а не ошибка - сохранённое поведение
    /// для совместимости
    #[inline(always)]
    pub fn get_value(&self, c: u32, column: u32) -> u32
    {
        self.checked_value(c, column).unwrap_or(0)
    }

    /// строгий вариант get_value: None вместо тихого нулевого значения
    pub fn checked_value(&self, c: u32, column: u32) -> Option<u32>
    {
        if self.is_compacted || c > MAX_CP || column as usize >= self.value_columns() {
            return None;
        }

        let row = self.search_row(c);

        Some(self.v[row * self.columns + column as usize + 2])
    }

    /// обход строк таблицы: (start, limit, значения).
    /// после компактизации строк больше нет - обход пуст
    pub fn ranges(&self) -> impl Iterator<Item = (u32, u32, &[u32])> + '_
    {
        let columns = self.columns;

        (0 .. self.rows).map(move |row| {
            let from = row * columns;

            (
                self.v[from],
                self.v[from + 1],
                &self.v[from + 2 .. from + columns],
            )
        })
    }

    /// дедуплицированный массив векторов значений - доступен после компактизации
    pub fn compacted_values(&self) -> Result<&[u32]>
    {
        match self.is_compacted {
            true => Ok(&self.v),
            false => Err(Error::IllegalState("table is not compacted yet")),
        }
    }

    pub(crate) fn into_values(self) -> Vec<u32>
    {
        self.v
    }

    /// строка, содержащая range_start.
    ///
    /// сначала проверяются кэшированная строка и две следующие за ней -
    /// реальные нагрузки обращаются к соседним диапазонам, и такая проверка
    /// разрешает большинство поисков за O(1). иначе - бинарный поиск.
    /// это сознательный размен сложности на локальность
    fn find_row(&mut self, range_start: u32) -> usize
    {
        let mut row = self.prev_row;

        if range_start >= self.start_of(row) {
            if range_start < self.limit_of(row) {
                return row;
            }

            // инвариант покрытия гарантирует, что за строкой с limit <= range_start
            // всегда есть следующая строка
            row += 1;
            if range_start < self.limit_of(row) {
                self.prev_row = row;
                return row;
            }

            row += 1;
            if range_start < self.limit_of(row) {
                self.prev_row = row;
                return row;
            }
        }

        let row = self.search_row(range_start);
        self.prev_row = row;

        row
    }

    /// бинарный поиск: последняя строка, начало которой не превышает адрес
    fn search_row(&self, c: u32) -> usize
    {
        let mut lo = 0;
        let mut hi = self.rows - 1;

        while lo < hi {
            let mid = (lo + hi + 1) / 2;

            match c >= self.start_of(mid) {
                true => lo = mid,
                false => hi = mid - 1,
            }
        }

        lo
    }

    /// рост массива строк по ступеням ёмкости
    fn grow(&mut self, need: usize) -> Result<()>
    {
        let new_rows = match need {
            n if n <= MEDIUM_ROWS => MEDIUM_ROWS,
            n if n <= MAX_ROWS => MAX_ROWS,
            _ => return Err(Error::CapacityExceeded("row capacity beyond the maximum tier")),
        };

        self.v.resize(new_rows * self.columns, 0);

        Ok(())
    }

    /// компактизация: дедупликация векторов значений и передача обработчику
    /// привязок диапазонов к слотам. необратима - после неё таблица хранит
    /// только дедуплицированный массив значений
    pub fn compact(&mut self, handler: &mut dyn CompactHandler) -> Result<()>
    {
        if self.is_compacted {
            return Err(Error::IllegalState("table is already compacted"));
        }

        let columns = self.columns;
        let value_columns = self.value_columns();

        // перестановка индексов строк, устойчиво отсортированная по векторам
        // значений; start и limit в сравнении не участвуют
        let mut order: Vec<usize> = (0 .. self.rows).collect();
        order.sort_by(|&a, &b| {
            self.v[a * columns + 2 .. (a + 1) * columns]
                .cmp(&self.v[b * columns + 2 .. (b + 1) * columns])
        });

        // первый проход: каждому первому вхождению вектора - очередной слот;
        // по псевдострокам сообщаем обработчику слоты начального значения и
        // значения ошибки
        let mut count = 0;
        {
            let mut prev: Option<&[u32]> = None;
            let mut slot = 0;

            for &row in order.iter() {
                let vector = &self.v[row * columns + 2 .. (row + 1) * columns];

                if prev.map_or(true, |p| p != vector) {
                    slot = count;
                    count += value_columns;
                    prev = Some(vector);
                }

                match self.start_of(row) {
                    INITIAL_VALUE_CP => handler.set_initial_value_slot(slot as u32),
                    ERROR_VALUE_CP => handler.set_error_value_slot(slot as u32),
                    _ => (),
                }
            }
        }

        tracing::debug!(
            rows = self.rows,
            unique = count / value_columns,
            "compacting property vectors"
        );

        handler.start_real_values(count as u32)?;

        // второй проход: материализуем уникальные векторы и привязываем
        // диапазоны реального домена к их слотам
        let mut out: Vec<u32> = Vec::with_capacity(count);
        {
            let mut prev: Option<&[u32]> = None;
            let mut slot = 0;

            for &row in order.iter() {
                let vector = &self.v[row * columns + 2 .. (row + 1) * columns];

                if prev.map_or(true, |p| p != vector) {
                    slot = out.len();
                    out.extend_from_slice(vector);
                    prev = Some(vector);
                }

                let start = self.start_of(row);
                if start < CODE_POINT_LIMIT {
                    handler.bind_range(start, self.limit_of(row) - 1, slot as u32)?;
                }
            }
        }

        self.v = out;
        self.rows = 0;
        self.is_compacted = true;

        Ok(())
    }
}
