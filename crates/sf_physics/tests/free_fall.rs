// crates/sf_physics/tests/free_fall.rs

//! 常加速度场中的自由落体：预估-校正与蛙跳对常加速度应严格
//! 复现解析轨迹 z = -½gt²。

use glam::{DVec3, DVec4};
use sf_config::{BodyConfig, RunConfig};
use sf_foundation::Scheduler;
use sf_physics::{
    AsymmetricSolver, ConstSmoothingLength, ConstantAcceleration, EquationHolder, Integrator,
    Statistics,
};
use sf_storage::{Material, OrderEnum, QuantityId, Storage};

const G: f64 = 9.81;

fn falling_particle() -> Storage {
    let mut storage = Storage::new();
    storage
        .insert_values(
            QuantityId::Position,
            OrderEnum::Second,
            vec![DVec4::new(0.0, 0.0, 0.0, 1.0)],
        )
        .unwrap();
    storage
        .insert_uniform(QuantityId::Mass, OrderEnum::Zero, 1.0)
        .unwrap();
    storage
        .insert_uniform(QuantityId::Density, OrderEnum::First, 1.0)
        .unwrap();
    let material = Material::from_body_config(&BodyConfig::default()).unwrap();
    storage.add_material(material, 0..1).unwrap();
    storage
}

fn run(integrator: Integrator, steps: usize, dt: f64) -> DVec4 {
    let config = RunConfig::default();
    let equations = EquationHolder::new()
        .with(Box::new(ConstantAcceleration::new(DVec3::new(0.0, 0.0, -G))))
        .with(Box::new(ConstSmoothingLength));
    let mut solver = AsymmetricSolver::new(Scheduler::Sequential, &config, equations).unwrap();
    let mut storage = falling_particle();
    solver.create(&mut storage).unwrap();

    let mut stats = Statistics::new();
    // 预估-校正与蛙跳从上一步的导数出发, 起步前先求值一次
    solver.integrate(&mut storage, 0.0, &mut stats).unwrap();
    for k in 0..steps {
        integrator
            .advance(&mut solver, &mut storage, k as f64 * dt, dt, &mut stats)
            .unwrap();
    }
    storage.values::<DVec4>(QuantityId::Position).unwrap()[0]
}

#[test]
fn test_predictor_corrector_exact_for_constant_acceleration() {
    let r = run(Integrator::PredictorCorrector, 100, 0.01);
    assert!((r.z + 0.5 * G).abs() < 1e-10, "z = {}", r.z);
    assert_eq!(r.x, 0.0);
    assert_eq!(r.y, 0.0);
}

#[test]
fn test_leapfrog_exact_for_constant_acceleration() {
    let r = run(Integrator::LeapFrog, 100, 0.01);
    assert!((r.z + 0.5 * G).abs() < 1e-10, "z = {}", r.z);
}

#[test]
fn test_euler_first_order_error() {
    // 半隐式欧拉: z(t) = -½g·t·(t+dt), 误差 ½g·t·dt
    let dt = 0.01;
    let r = run(Integrator::EulerExplicit, 100, dt);
    let expected = -0.5 * G * (1.0 + dt);
    assert!((r.z - expected).abs() < 1e-10, "z = {}", r.z);
}
