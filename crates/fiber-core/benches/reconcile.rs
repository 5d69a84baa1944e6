use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fiber_core::{component, h, text, Component, Element, FiberRoot, MemoryHost, MemoryNodeId, Props};

const SECTION_COUNT: usize = 4;
const ROWS_PER_SECTION: usize = 32;
const ROWS_PER_SECTION_SAMPLES: &[usize] = &[8, 16, 32, 64];

fn row(props: &Props) -> Element {
    let section = props.get_int("section").unwrap_or_default();
    let row = props.get_int("row").unwrap_or_default();
    let revision = props.get_int("revision").unwrap_or_default();
    h("li")
        .attr("class", if row % 2 == 0 { "even" } else { "odd" })
        .child(text(format!("Item {section}-{row} title")))
        .child(h("span").child(text(format!("Detail r{revision}"))))
        .build()
}

const ROW: Component = Component::new("Row", row);

fn page(sections: usize, rows_per_section: usize, revision: i64) -> Element {
    h("main")
        .children((0..sections).map(|section| {
            h("section")
                .child(h("h2").child(text(format!("Section {section}"))))
                .children((0..rows_per_section).map(|row| {
                    component(ROW)
                        .attr("section", section as i64)
                        .attr("row", row as i64)
                        .attr("revision", revision)
                }))
        }))
        .build()
}

fn node_count(sections: usize, rows_per_section: usize) -> usize {
    1 + sections * (3 + rows_per_section * 4)
}

struct Fixture {
    root: FiberRoot<MemoryHost>,
    container: MemoryNodeId,
    sections: usize,
    rows_per_section: usize,
    revision: i64,
}

impl Fixture {
    fn new(sections: usize, rows_per_section: usize) -> Self {
        let mut host = MemoryHost::new();
        let container = host.create_container();
        Self {
            root: FiberRoot::new(host),
            container,
            sections,
            rows_per_section,
            revision: 0,
        }
    }

    fn render(&mut self, bump: bool) {
        if bump {
            self.revision += 1;
        }
        let element = page(self.sections, self.rows_per_section, self.revision);
        self.root.render(element, self.container);
        let reports = self.root.flush().expect("render pass");
        black_box(reports);
    }
}

fn bench_mount(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_mount");
    for &rows_per_section in ROWS_PER_SECTION_SAMPLES {
        group.bench_with_input(
            BenchmarkId::new("host_nodes", node_count(SECTION_COUNT, rows_per_section)),
            &rows_per_section,
            |b, &rows_per_section| {
                b.iter(|| {
                    let mut fixture = Fixture::new(SECTION_COUNT, rows_per_section);
                    fixture.render(false);
                });
            },
        );
    }
    group.finish();
}

fn bench_unchanged(c: &mut Criterion) {
    let mut fixture = Fixture::new(SECTION_COUNT, ROWS_PER_SECTION);
    // Mount first so the steady-state diff is measured.
    fixture.render(false);

    c.bench_function("reconcile_unchanged", |b| {
        b.iter(|| fixture.render(false));
    });
}

fn bench_text_updates(c: &mut Criterion) {
    let mut fixture = Fixture::new(SECTION_COUNT, ROWS_PER_SECTION);
    fixture.render(false);

    c.bench_function("reconcile_text_updates", |b| {
        b.iter(|| fixture.render(true));
    });
}

criterion_group!(reconcile, bench_mount, bench_unchanged, bench_text_updates);
criterion_main!(reconcile);
