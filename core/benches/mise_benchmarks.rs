use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mise::{
  pantry, spice, CastOptions, CookContext, Ingredient, IngredientRegistry, InputType, Kitchen, KitchenConfig, Serving,
  Spice, SpiceValue, Spices, ValueKind,
};
use std::sync::Arc;
use tokio::runtime::Runtime; // To run async code within Criterion

fn bench_config() -> KitchenConfig {
  KitchenConfig {
    auto_cook: false,
    persist: false,
    ..KitchenConfig::default()
  }
}

// --- Helper: Simple Synchronous Ingredient ---
fn sync_append(id: String) -> Ingredient {
  Ingredient::new_sync(id.clone(), id, |input, _spices| {
    let mut text = input.to_string();
    text.push('.');
    Ok(InputType::new(text).into())
  })
}

// --- Helper: Simple Asynchronous Ingredient ---
fn async_io(id: String, delay_micros: u64) -> Ingredient {
  Ingredient::new(id.clone(), id, move |input: InputType, _spices: Spices, _ctx: CookContext| async move {
    if delay_micros > 0 {
      tokio::time::sleep(std::time::Duration::from_micros(delay_micros)).await;
    }
    Ok::<_, anyhow::Error>(Serving::Value(input))
  })
}

fn kitchen_with_steps(ingredients: Vec<Ingredient>) -> Arc<Kitchen> {
  let registry = Arc::new(IngredientRegistry::new());
  let ids: Vec<String> = ingredients.iter().map(|i| i.id.clone()).collect();
  for ingredient in ingredients {
    registry.register(ingredient);
  }
  let kitchen = Kitchen::new(registry, bench_config());
  for id in ids {
    kitchen.add_step(&id).unwrap();
  }
  kitchen.set_input_data("benchmark input");
  kitchen
}

// --- Benchmark Functions ---

fn bench_cook_sync_steps(c: &mut Criterion) {
  let mut group = c.benchmark_group("CookSync");
  let rt = Runtime::new().unwrap();

  for num_steps in [1, 5, 10, 50].iter() {
    let kitchen = kitchen_with_steps((0..*num_steps).map(|i| sync_append(format!("step_{}", i))).collect());

    group.throughput(Throughput::Elements(*num_steps as u64));
    group.bench_with_input(BenchmarkId::from_parameter(num_steps), num_steps, |b, _| {
      b.to_async(&rt).iter(|| {
        let kitchen = kitchen.clone();
        async move { kitchen.cook().await }
      });
    });
  }
  group.finish();
}

fn bench_cook_async_steps(c: &mut Criterion) {
  let mut group = c.benchmark_group("CookAsyncIO");
  let rt = Runtime::new().unwrap();

  for num_steps in [1, 5, 10].iter() {
    for delay_us in [0, 10, 100].iter() {
      let kitchen = kitchen_with_steps(
        (0..*num_steps)
          .map(|i| async_io(format!("step_{}", i), *delay_us))
          .collect(),
      );

      group.throughput(Throughput::Elements(*num_steps as u64));
      group.bench_with_input(
        BenchmarkId::new(format!("{}steps", num_steps), format!("{}us_delay", delay_us)),
        delay_us,
        |b, _| {
          b.to_async(&rt).iter(|| {
            let kitchen = kitchen.clone();
            async move { kitchen.cook().await }
          });
        },
      );
    }
  }
  group.finish();
}

fn bench_value_casts(c: &mut Criterion) {
  let mut group = c.benchmark_group("ValueCasts");
  let number_text = InputType::new(" 12345.678 ");
  let bytes = InputType::new(vec![0xAB_u8; 1024]);
  let options = CastOptions::new().min(0.0).max(1_000.0);

  group.bench_function("string_to_number_clamped", |b| {
    b.iter(|| criterion::black_box(number_text.to_number(&options).unwrap()))
  });
  group.bench_function("bytes_to_base64_1k", |b| {
    b.iter(|| criterion::black_box(bytes.cast(ValueKind::Base64, &CastOptions::new()).unwrap()))
  });
  group.bench_function("bytes_to_hex_1k", |b| {
    b.iter(|| criterion::black_box(bytes.cast(ValueKind::Hex, &CastOptions::new()).unwrap()))
  });
  group.finish();
}

fn bench_spice_validation(c: &mut Criterion) {
  let mut group = c.benchmark_group("SpiceValidation");
  let mut ingredient = sync_append("spiced".to_string()).spice(Spice::boolean("root", "Root", true));
  for i in 0..20 {
    ingredient = ingredient.spice(
      Spice::number(format!("n{}", i), format!("N{}", i), 1.0)
        .range(Some(0.0), Some(10.0))
        .depends_on("root", true),
    );
  }
  let raw: Spices = (0..20)
    .map(|i| (format!("n{}", i), SpiceValue::from(format!("{}", i))))
    .collect();

  group.bench_function("validate_20", |b| {
    b.iter(|| criterion::black_box(spice::validate(&ingredient, &raw)))
  });
  group.bench_function("visible_20", |b| {
    b.iter(|| criterion::black_box(spice::visible_spices(&ingredient, &raw)))
  });
  group.finish();
}

fn bench_registry_batch(c: &mut Criterion) {
  let mut group = c.benchmark_group("RegistryBatch");
  let config = bench_config();

  group.throughput(Throughput::Elements(10));
  group.bench_function("register_pantry", |b| {
    b.iter_batched(
      IngredientRegistry::new,
      |registry| {
        pantry::register_all(&registry, &config);
        registry
      },
      criterion::BatchSize::SmallInput,
    );
  });
  group.finish();
}

criterion_group!(
  benches,
  bench_cook_sync_steps,
  bench_cook_async_steps,
  bench_value_casts,
  bench_spice_validation,
  bench_registry_batch
);
criterion_main!(benches);
