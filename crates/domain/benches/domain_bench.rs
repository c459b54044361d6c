use criterion::{Criterion, criterion_group, criterion_main};
use domain::{AggregateRoot, Money, Product, ProductId, Sku};
use rust_decimal::Decimal;

fn money(cents: i64) -> Money {
    Money::new(Decimal::new(cents, 2)).unwrap()
}

fn bench_create_product(c: &mut Criterion) {
    c.bench_function("domain/create_product", |b| {
        b.iter(|| {
            Product::new(
                ProductId::new(),
                "Benchmark Widget",
                Sku::parse("BEN-001").unwrap(),
                money(1999),
                money(1000),
                10,
            )
            .unwrap()
        });
    });
}

fn bench_guarded_update(c: &mut Criterion) {
    let mut product = Product::new(
        ProductId::new(),
        "Benchmark Widget",
        Sku::parse("BEN-001").unwrap(),
        money(1999),
        money(1000),
        10,
    )
    .unwrap();

    c.bench_function("domain/update_price_and_stock", |b| {
        b.iter(|| {
            product.update_price(money(2099), money(1000)).unwrap();
            product.adjust_stock(1).unwrap();
            product.take_events();
        });
    });
}

fn bench_rejected_update(c: &mut Criterion) {
    let mut product = Product::new(
        ProductId::new(),
        "Benchmark Widget",
        Sku::parse("BEN-001").unwrap(),
        money(1999),
        money(1000),
        10,
    )
    .unwrap();

    c.bench_function("domain/rejected_update_rollback", |b| {
        b.iter(|| {
            let _ = product.update_price(money(500), money(1000));
        });
    });
}

fn bench_sku_normalize(c: &mut Criterion) {
    c.bench_function("domain/sku_parse", |b| {
        b.iter(|| Sku::parse(" prd-0o1_abc ").unwrap());
    });
}

criterion_group!(
    benches,
    bench_create_product,
    bench_guarded_update,
    bench_rejected_update,
    bench_sku_normalize
);
criterion_main!(benches);
