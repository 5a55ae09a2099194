// crates/sf_storage/src/eos.rs

//! 状态方程
//!
//! 由 (密度, 比内能) 求 (压强, 声速)。具体方程以 trait 对象挂接在材料上。

/// 状态方程接口
pub trait Eos: Send + Sync + std::fmt::Debug {
    /// 求值，返回 (压强, 声速)
    fn evaluate(&self, rho: f64, u: f64) -> (f64, f64);

    fn name(&self) -> &'static str;
}

/// 理想气体 p = (γ-1)·u·ρ
#[derive(Debug, Clone)]
pub struct IdealGasEos {
    gamma: f64,
}

impl IdealGasEos {
    pub fn new(gamma: f64) -> Self {
        debug_assert!(gamma > 1.0);
        Self { gamma }
    }

    /// 由压强反求比内能（生成初始条件用）
    pub fn internal_energy(&self, rho: f64, p: f64) -> f64 {
        p / ((self.gamma - 1.0) * rho)
    }
}

impl Eos for IdealGasEos {
    fn evaluate(&self, rho: f64, u: f64) -> (f64, f64) {
        let p = (self.gamma - 1.0) * u * rho;
        (p, (self.gamma * p / rho).max(0.0).sqrt())
    }

    fn name(&self) -> &'static str {
        "ideal gas"
    }
}

/// 线性化 Murnaghan 方程 p = cs²·(ρ - ρ₀)，cs = √(A/ρ₀)
///
/// 声速为常数，适合小压缩比的固体近似。
#[derive(Debug, Clone)]
pub struct MurnaghanEos {
    rho0: f64,
    bulk: f64,
}

impl MurnaghanEos {
    pub fn new(rho0: f64, bulk: f64) -> Self {
        debug_assert!(rho0 > 0.0 && bulk > 0.0);
        Self { rho0, bulk }
    }
}

impl Eos for MurnaghanEos {
    fn evaluate(&self, rho: f64, _u: f64) -> (f64, f64) {
        let cs2 = self.bulk / self.rho0;
        (cs2 * (rho - self.rho0), cs2.sqrt())
    }

    fn name(&self) -> &'static str {
        "murnaghan"
    }
}
