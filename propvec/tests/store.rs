use unicode_propvec::{Error, PropsVectors};

/// проверка инварианта покрытия: строки отсортированы, не пересекаются
/// и покрывают весь домен без разрывов
fn assert_coverage(pv: &PropsVectors)
{
    let mut expected_start = 0;

    for (start, limit, _) in pv.ranges() {
        assert_eq!(start, expected_start);
        assert!(limit > start);

        expected_start = limit;
    }

    assert_eq!(expected_start, 0x110002);
}

#[test]
fn test_new_table()
{
    let pv = PropsVectors::new(2).unwrap();

    assert_eq!(pv.value_columns(), 2);
    assert_eq!(pv.rows(), 3);
    assert_coverage(&pv);
}

#[test]
fn test_new_invalid_columns()
{
    assert!(matches!(PropsVectors::new(0), Err(Error::InvalidArgument(_))));
}

#[test]
fn test_set_and_get()
{
    let mut pv = PropsVectors::new(1).unwrap();

    pv.set_value(0x41, 0x5A, 0, 1, 0xFFFFFFFF).unwrap();

    assert_eq!(pv.get_value(0x40, 0), 0);
    assert_eq!(pv.get_value(0x41, 0), 1);
    assert_eq!(pv.get_value(0x5A, 0), 1);
    assert_eq!(pv.get_value(0x5B, 0), 0);

    assert_eq!(pv.rows(), 5);
    assert_coverage(&pv);
}

#[test]
fn test_masked_update()
{
    let mut pv = PropsVectors::new(2).unwrap();

    pv.set_value(0x100, 0x1FF, 1, 0xAB00, 0xFF00).unwrap();
    pv.set_value(0x100, 0x1FF, 1, 0x00CD, 0x00FF).unwrap();

    // маски не пересекаются - оба значения сосуществуют в одной колонке
    assert_eq!(pv.get_value(0x180, 1), 0xABCD);
    // вторая колонка не тронута
    assert_eq!(pv.get_value(0x180, 0), 0);

    // перезапись по маске сохраняет биты вне маски
    pv.set_value(0x100, 0x1FF, 1, 0x1200, 0xFF00).unwrap();
    assert_eq!(pv.get_value(0x180, 1), 0x12CD);

    assert_coverage(&pv);
}

#[test]
fn test_no_op_split_avoidance()
{
    let mut pv = PropsVectors::new(1).unwrap();

    pv.set_value(0x100, 0x1FF, 0, 5, 0xFFFFFFFF).unwrap();
    let rows = pv.rows();

    // граница пересекающегося диапазона попадает в строку с тем же значением -
    // разрезания не происходит
    pv.set_value(0x100, 0x17F, 0, 5, 0xFFFFFFFF).unwrap();
    assert_eq!(pv.rows(), rows);

    pv.set_value(0x100, 0x1FF, 0, 5, 0xFFFFFFFF).unwrap();
    assert_eq!(pv.rows(), rows);

    assert_coverage(&pv);
}

#[test]
fn test_invalid_arguments()
{
    let mut pv = PropsVectors::new(1).unwrap();

    assert!(matches!(
        pv.set_value(0x100, 0xFF, 0, 1, !0),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        pv.set_value(0, 0x110002, 0, 1, !0),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        pv.set_value(0, 0xFF, 1, 1, !0),
        Err(Error::InvalidArgument(_))
    ));

    // таблица не изменена
    assert_eq!(pv.rows(), 3);
    assert_coverage(&pv);
}

#[test]
fn test_pseudo_rows()
{
    let mut pv = PropsVectors::new(1).unwrap();

    // псевдокодпоинты доступны через обычный set_value / get_value
    pv.set_value(0x110000, 0x110000, 0, 0xAA, !0).unwrap();
    pv.set_value(0x110001, 0x110001, 0, 0xBB, !0).unwrap();

    assert_eq!(pv.get_value(0x110000, 0), 0xAA);
    assert_eq!(pv.get_value(0x110001, 0), 0xBB);
    assert_eq!(pv.get_value(0x10FFFF, 0), 0);

    assert_coverage(&pv);
}

#[test]
fn test_permissive_get()
{
    let pv = PropsVectors::new(1).unwrap();

    // за пределами домена - тихое нулевое значение
    assert_eq!(pv.get_value(0x110002, 0), 0);
    assert_eq!(pv.get_value(u32::MAX, 0), 0);

    // строгий вариант различает "нет данных" и "ноль"
    assert_eq!(pv.checked_value(0x110002, 0), None);
    assert_eq!(pv.checked_value(0x20, 0), Some(0));
}

#[test]
fn test_overlapping_sequence()
{
    let mut pv = PropsVectors::new(2).unwrap();

    pv.set_value(0, 0xFFFF, 0, 1, !0).unwrap();
    pv.set_value(0x8000, 0x2FFFF, 0, 2, !0).unwrap();
    pv.set_value(0x100, 0x1FF, 1, 3, !0).unwrap();
    pv.set_value(0, 0x10FFFF, 1, 0x40, 0xC0).unwrap();
    pv.set_value(0x1F000, 0x10FFFF, 0, 7, !0).unwrap();

    assert_eq!(pv.get_value(0x80, 0), 1);
    assert_eq!(pv.get_value(0x8000, 0), 2);
    assert_eq!(pv.get_value(0x180, 1), 3 & !0xC0 | 0x40);
    assert_eq!(pv.get_value(0x2FFFF, 0), 7);
    assert_eq!(pv.get_value(0x10FFFF, 1), 0x40);

    assert_coverage(&pv);
}

/// разрозненные одноадресные диапазоны с уникальными значениями:
/// каждая запись разрезает строку дважды и заставляет массив строк
/// пройти все ступени ёмкости
#[test]
fn test_capacity_tier_growth()
{
    let mut pv = PropsVectors::new(1).unwrap();

    for i in 0 .. 2000u32 {
        let c = 0x100 + i * 2;
        pv.set_value(c, c, 0, i + 1, !0).unwrap();
    }

    assert_eq!(pv.rows(), 3 + 2 * 2000);
    assert_coverage(&pv);

    for i in (0 .. 2000u32).step_by(97) {
        let c = 0x100 + i * 2;

        assert_eq!(pv.get_value(c, 0), i + 1);
        assert_eq!(pv.get_value(c + 1, 0), 0);
    }
}
