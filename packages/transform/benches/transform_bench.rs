use criterion::{black_box, criterion_group, criterion_main, Criterion};
use folio_model::Node;
use folio_schema_basic::{doc, p, schema};
use folio_transform::{Mappable, Mapping, StepMap, Transform};

fn long_doc(paragraphs: usize) -> Node {
    let s = schema();
    let para = s.node_type("paragraph").unwrap();
    let blocks: Vec<Node> = (0..paragraphs)
        .map(|i| {
            let text = s.text(&format!("paragraph number {}", i), &[]).unwrap();
            para.create(None, text, &[]).unwrap()
        })
        .collect();
    s.node_type("doc").unwrap().create(None, blocks, &[]).unwrap()
}

fn type_characters(c: &mut Criterion) {
    let d = doc![p!["hello"]];
    c.bench_function("type_100_characters", |b| {
        b.iter(|| {
            let mut tr = Transform::new(d.doc.clone());
            for i in 0..100 {
                tr.insert_text("x", 6 + i, None).unwrap();
            }
            black_box(tr.doc().content().size())
        })
    });
}

fn edit_large_document(c: &mut Criterion) {
    let d = long_doc(1000);
    let strong = schema().mark("strong", None).unwrap();
    let middle = d.content().iter().take(500).map(|n| n.node_size()).sum::<usize>() + 1;
    c.bench_function("insert_in_1000_paragraphs", |b| {
        b.iter(|| {
            let mut tr = Transform::new(d.clone());
            tr.insert_text("abc", black_box(middle), None).unwrap();
            tr.doc().content().size()
        })
    });
    c.bench_function("add_mark_across_1000_paragraphs", |b| {
        b.iter(|| {
            let mut tr = Transform::new(d.clone());
            tr.add_mark(1, d.content().size() - 1, &strong).unwrap();
            tr.steps().len()
        })
    });
}

fn map_through_long_mapping(c: &mut Criterion) {
    let maps: Vec<StepMap> = (0..500).map(|i| StepMap::single(i * 2, 0, 1)).collect();
    let mapping = Mapping::from_maps(maps);
    c.bench_function("map_through_500_maps", |b| {
        b.iter(|| mapping.map(black_box(750), 1))
    });
}

criterion_group!(benches, type_characters, edit_large_document, map_through_long_mapping);
criterion_main!(benches);
