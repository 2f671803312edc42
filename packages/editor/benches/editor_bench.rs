use criterion::{black_box, criterion_group, criterion_main, Criterion};
use formsmith_editor::{
    from_fields, resolve_drop, to_fields, DragGeometry, DragSource, FieldDef, FieldRegistry,
    IDGenerator, OverTarget, Rect, ResolverConfig, TabDef,
};

fn sample_schema(sections: usize) -> Vec<FieldDef> {
    (0..sections)
        .map(|i| {
            FieldDef::new("group")
                .with("label", format!("Section {}", i))
                .with_fields(vec![
                    FieldDef::new("row").with_fields(vec![
                        FieldDef::new("text").with("name", format!("first_{}", i)),
                        FieldDef::new("text").with("name", format!("last_{}", i)),
                    ]),
                    FieldDef::new("email").with("name", format!("email_{}", i)),
                    FieldDef::new("tabs").with_tabs(vec![
                        TabDef::new("home", "Home").with_fields(vec![
                            FieldDef::new("textarea").with("name", format!("notes_{}", i)),
                        ]),
                        TabDef::new("work", "Work"),
                    ]),
                ])
        })
        .collect()
}

fn import_schema(c: &mut Criterion) {
    let registry = FieldRegistry::with_builtin_types();
    let schema = sample_schema(50);

    c.bench_function("import_schema", |b| {
        b.iter(|| {
            let mut ids = IDGenerator::from_seed("bench");
            from_fields(black_box(&schema), &registry, &mut ids)
        })
    });
}

fn export_schema(c: &mut Criterion) {
    let registry = FieldRegistry::with_builtin_types();
    let mut ids = IDGenerator::from_seed("bench");
    let tree = from_fields(&sample_schema(50), &registry, &mut ids);

    c.bench_function("export_schema", |b| {
        b.iter(|| to_fields(black_box(&tree), &registry))
    });
}

fn resolve_drop_over_group(c: &mut Criterion) {
    let registry = FieldRegistry::with_builtin_types();
    let mut ids = IDGenerator::from_seed("bench");
    let tree = from_fields(&sample_schema(50), &registry, &mut ids);
    let config = ResolverConfig::default();

    let target = tree.root_ids()[25].clone();
    let over = OverTarget::Node(target);
    let source = DragSource::NewField("text".to_string());
    let geometry = DragGeometry {
        active: Rect::new(0.0, 140.0, 200.0, 40.0),
        over: Rect::new(0.0, 100.0, 400.0, 300.0),
    };

    c.bench_function("resolve_drop_over_group", |b| {
        b.iter(|| {
            resolve_drop(
                black_box(&tree),
                &registry,
                &source,
                Some(&over),
                black_box(&geometry),
                &config,
            )
        })
    });
}

criterion_group!(benches, import_schema, export_schema, resolve_drop_over_group);
criterion_main!(benches);
