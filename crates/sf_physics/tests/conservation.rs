// crates/sf_physics/tests/conservation.rs

//! 守恒性检验：对称化核梯度使粒子对作用力反对称，
//! 无外力气体块的总动量应保持在舍入误差量级。

use glam::{DVec3, DVec4};
use sf_config::{BodyConfig, ContinuityChoice, EosChoice, RheologyChoice, RunConfig};
use sf_foundation::Scheduler;
use sf_physics::{
    AsymmetricSolver, ConstSmoothingLength, ContinuityEquation, EquationHolder, Integrator,
    PressureForce, Statistics,
};
use sf_storage::{Material, OrderEnum, QuantityId, Storage};

fn gas_block(side: usize, spacing: f64) -> Storage {
    let n = side * side * side;
    let h = 1.3 * spacing;
    let positions: Vec<DVec4> = (0..n)
        .map(|k| {
            DVec4::new(
                (k % side) as f64 * spacing,
                ((k / side) % side) as f64 * spacing,
                (k / (side * side)) as f64 * spacing,
                h,
            )
        })
        .collect();
    let rho0 = 1.0;
    let mass = rho0 * spacing * spacing * spacing;
    let mut storage = Storage::new();
    storage
        .insert_values(QuantityId::Position, OrderEnum::Second, positions)
        .unwrap();
    storage
        .insert_uniform(QuantityId::Mass, OrderEnum::Zero, mass)
        .unwrap();
    storage
        .insert_uniform(QuantityId::Density, OrderEnum::First, rho0)
        .unwrap();
    storage
        .insert_uniform(QuantityId::Energy, OrderEnum::First, 1.0)
        .unwrap();
    let config = BodyConfig {
        eos: EosChoice::IdealGas,
        rheology: RheologyChoice::None,
        density: rho0,
        density_min: 1e-3,
        ..BodyConfig::default()
    };
    let material = Material::from_body_config(&config).unwrap();
    storage.add_material(material, 0..n).unwrap();
    storage
}

fn momentum(storage: &Storage) -> DVec3 {
    let m = storage.values::<f64>(QuantityId::Mass).unwrap();
    let v = storage.dt::<DVec4>(QuantityId::Position).unwrap();
    m.iter()
        .zip(v)
        .fold(DVec3::ZERO, |acc, (&mi, vi)| acc + mi * vi.truncate())
}

#[test]
fn test_momentum_and_mass_conserved() {
    let config = RunConfig::default();
    let equations = EquationHolder::new()
        .with(Box::new(PressureForce))
        .with(Box::new(ContinuityEquation::new(ContinuityChoice::Standard)))
        .with(Box::new(ConstSmoothingLength));
    let mut solver = AsymmetricSolver::new(Scheduler::Sequential, &config, equations).unwrap();
    let mut storage = gas_block(6, 0.1);
    solver.create(&mut storage).unwrap();

    let mass0: f64 = storage
        .values::<f64>(QuantityId::Mass)
        .unwrap()
        .iter()
        .sum();

    let mut stats = Statistics::new();
    solver.integrate(&mut storage, 0.0, &mut stats).unwrap();

    // 作用力的量级, 作为误差的参照
    let dv = storage.d2t::<DVec4>(QuantityId::Position).unwrap();
    let m = storage.values::<f64>(QuantityId::Mass).unwrap();
    let scale: f64 = m
        .iter()
        .zip(dv)
        .map(|(&mi, ai)| mi * ai.truncate().length())
        .sum();
    assert!(scale > 0.0);

    // 合力在舍入误差量级
    let total: DVec3 = m
        .iter()
        .zip(dv)
        .fold(DVec3::ZERO, |acc, (&mi, ai)| acc + mi * ai.truncate());
    assert!(
        total.length() < 1e-10 * scale,
        "合力 {total:?} 对比量级 {scale}"
    );

    // 推进若干步后动量仍应接近零
    let dt = 1e-4;
    for k in 0..20 {
        Integrator::EulerExplicit
            .advance(&mut solver, &mut storage, k as f64 * dt, dt, &mut stats)
            .unwrap();
    }
    let p = momentum(&storage);
    assert!(
        p.length() < 1e-10 * scale * 20.0 * dt,
        "动量漂移 {p:?}"
    );

    // 粒子质量为零阶量, 总质量不变
    let mass1: f64 = storage
        .values::<f64>(QuantityId::Mass)
        .unwrap()
        .iter()
        .sum();
    assert_eq!(mass0, mass1);
}
