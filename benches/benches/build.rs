use criterion::{criterion_group, criterion_main, Criterion};
use unicode_propvec::{CompactedProps, PropsVectors};

/// таблица, похожая по профилю на реальные свойства юникода:
/// плотные данные в начале BMP, редкие диапазоны в дополнительных плоскостях
fn fill(pv: &mut PropsVectors)
{
    for i in 0 .. 1200u32 {
        let c = 0x100 + i * 3;
        pv.set_value(c, c + 1, 0, i % 30 + 1, 0xFF).unwrap();
    }

    pv.set_value(0x4E00, 0x9FFF, 0, 0x40, 0xFF).unwrap();
    pv.set_value(0x1F300, 0x1F9FF, 1, 0x21, 0xFF).unwrap();
    pv.set_value(0x20000, 0x2A6DF, 0, 0x40, 0xFF).unwrap();
    pv.set_value(0, 0x10FFFF, 1, 0x8000, 0x8000).unwrap();
}

fn build(c: &mut Criterion)
{
    c.bench_function("build_and_compact", |b| {
        b.iter(|| {
            let mut pv = PropsVectors::new(2).unwrap();
            fill(&mut pv);

            pv.compact_to_trie().unwrap()
        })
    });
}

fn lookup(c: &mut Criterion)
{
    let mut pv = PropsVectors::new(2).unwrap();
    fill(&mut pv);

    let compacted: CompactedProps = pv.compact_to_trie().unwrap();

    c.bench_function("lookup", |b| {
        b.iter(|| {
            let mut sum = 0u64;

            for code in (0 .. 0x110000u32).step_by(64) {
                sum += compacted.get(code, 0) as u64;
            }

            sum
        })
    });
}

criterion_group!(benches, build, lookup);
criterion_main!(benches);
