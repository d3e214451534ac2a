/// Explicit Runge-Kutta methods as Butcher tableaux
///
///   c | A
///   --+---
///     | b^T
///
/// `RKMethod` is a closed list of the methods used by the Lyness experiment; each variant maps
/// to a fixed tableau, so an unknown method is a compile error for code and a "method not found"
/// error only for names read from text (task files).
use log::info;
use nalgebra::{DMatrix, DVector};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

/// Errors raised while building a tableau from user data
#[derive(Debug, Clone, PartialEq)]
pub enum TableauError {
    Empty,
    NotSquare { rows: usize, cols: usize },
    WeightsLength { stages: usize, weights: usize },
    NotExplicit { row: usize, col: usize, value: f64 },
    LowerEntries { stages: usize, expected: usize, got: usize },
}

impl fmt::Display for TableauError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TableauError::Empty => write!(f, "Butcher tableau has no stages"),
            TableauError::NotSquare { rows, cols } => {
                write!(f, "matrix A must be square, got {}x{}", rows, cols)
            }
            TableauError::WeightsLength { stages, weights } => write!(
                f,
                "weights vector b has {} entries but the method has {} stages",
                weights, stages
            ),
            TableauError::NotExplicit { row, col, value } => write!(
                f,
                "only explicit methods are supported: A[{}][{}] = {} on or above the diagonal",
                row, col, value
            ),
            TableauError::LowerEntries {
                stages,
                expected,
                got,
            } => write!(
                f,
                "a {}-stage explicit method needs {} entries below the diagonal, got {}",
                stages, expected, got
            ),
        }
    }
}

impl std::error::Error for TableauError {}

/// Error returned when a method name is not part of the registry
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownMethod(pub String);

impl fmt::Display for UnknownMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "method not found: {}", self.0)
    }
}

impl std::error::Error for UnknownMethod {}

/// Butcher tableau coefficients of an explicit Runge-Kutta method
#[derive(Debug, Clone, PartialEq)]
pub struct ButcherTableau {
    pub a: DMatrix<f64>, // Runge-Kutta matrix, strictly lower triangular
    pub b: DVector<f64>, // weights
    pub c: DVector<f64>, // nodes, row sums of A
    pub stages: usize,
    pub order: usize,
    pub name: String,
}

impl ButcherTableau {
    /// validated constructor for user supplied coefficients
    pub fn new(
        a: DMatrix<f64>,
        b: DVector<f64>,
        order: usize,
        name: &str,
    ) -> Result<ButcherTableau, TableauError> {
        let (rows, cols) = a.shape();
        if rows == 0 {
            return Err(TableauError::Empty);
        }
        if rows != cols {
            return Err(TableauError::NotSquare { rows, cols });
        }
        if b.len() != rows {
            return Err(TableauError::WeightsLength {
                stages: rows,
                weights: b.len(),
            });
        }
        for i in 0..rows {
            for j in i..cols {
                if a[(i, j)] != 0.0 {
                    return Err(TableauError::NotExplicit {
                        row: i,
                        col: j,
                        value: a[(i, j)],
                    });
                }
            }
        }
        Ok(Self::assemble(a, b, order, name))
    }

    /// builds a tableau from the entries strictly below the diagonal, row by row
    /// (row 1: a10; row 2: a20, a21; ...), as they are written in a task file
    pub fn from_lower_entries(
        lower: &[f64],
        b: &[f64],
        order: usize,
        name: &str,
    ) -> Result<ButcherTableau, TableauError> {
        let s = b.len();
        if s == 0 {
            return Err(TableauError::Empty);
        }
        let expected = s * (s - 1) / 2;
        if lower.len() != expected {
            return Err(TableauError::LowerEntries {
                stages: s,
                expected,
                got: lower.len(),
            });
        }
        let mut a = DMatrix::zeros(s, s);
        let mut k = 0;
        for i in 1..s {
            for j in 0..i {
                a[(i, j)] = lower[k];
                k += 1;
            }
        }
        Self::new(a, DVector::from_column_slice(b), order, name)
    }

    /// bundled coefficients: `rows` lists A row by row starting from the second stage,
    /// each row holding only its entries left of the diagonal
    fn explicit(rows: &[&[f64]], b: &[f64], order: usize, name: &str) -> ButcherTableau {
        let s = b.len();
        let mut a = DMatrix::zeros(s, s);
        for (i, row) in rows.iter().enumerate() {
            for (j, &value) in row.iter().enumerate() {
                a[(i + 1, j)] = value;
            }
        }
        Self::assemble(a, DVector::from_column_slice(b), order, name)
    }

    fn assemble(a: DMatrix<f64>, b: DVector<f64>, order: usize, name: &str) -> ButcherTableau {
        let stages = b.len();
        let c = DVector::from_fn(stages, |i, _| a.row(i).sum());
        ButcherTableau {
            a,
            b,
            c,
            stages,
            order,
            name: name.to_string(),
        }
    }

    pub fn is_explicit(&self) -> bool {
        (0..self.stages).all(|i| (i..self.stages).all(|j| self.a[(i, j)] == 0.0))
    }

    /// largest absolute residual among the order conditions of each order 1..=p:
    /// entry q-1 is max |b . Phi(t) - 1/gamma(t)| over the rooted trees t with q nodes
    pub fn order_residuals(&self, p: usize) -> Vec<f64> {
        let trees = rooted_trees(p);
        let mut residuals = vec![0.0_f64; p];
        // elementary weights, Phi(t)_i = prod over subtrees u of (A Phi(u))_i
        let mut weights: Vec<DVector<f64>> = Vec::with_capacity(trees.len());
        for tree in &trees {
            let mut phi = DVector::from_element(self.stages, 1.0);
            for &child in &tree.children {
                phi.component_mul_assign(&(&self.a * &weights[child]));
            }
            let r = (self.b.dot(&phi) - 1.0 / tree.density).abs();
            let worst = &mut residuals[tree.order - 1];
            // NaN coefficients must not pass as order conditions
            if r.is_nan() || r > *worst {
                *worst = r;
            }
            weights.push(phi);
        }
        residuals
    }

    /// largest absolute residual among the order conditions of exactly order p
    pub fn order_residual(&self, p: usize) -> f64 {
        self.order_residuals(p).last().copied().unwrap_or(0.0)
    }

    /// checks the order conditions of every order up to p
    pub fn satisfies_order(&self, p: usize, tol: f64) -> bool {
        self.order_residuals(p).iter().all(|&r| r <= tol)
    }
}

/// rooted tree with `order` nodes; `children` index the subtrees in the list built by
/// `rooted_trees`, `density` is gamma(t)
#[derive(Debug, Clone)]
struct RootedTree {
    order: usize,
    density: f64,
    children: Vec<usize>,
}

/// all rooted trees with at most `max_order` nodes, grouped by order so that every
/// subtree comes before the trees grafted from it (1, 1, 2, 4, 9, 20, 48, 115, ...)
fn rooted_trees(max_order: usize) -> Vec<RootedTree> {
    let mut trees: Vec<RootedTree> = Vec::new();
    if max_order == 0 {
        return trees;
    }
    trees.push(RootedTree {
        order: 1,
        density: 1.0,
        children: Vec::new(),
    });
    for n in 2..=max_order {
        let mut forests = Vec::new();
        forests_of_order(&trees, n - 1, 0, &mut Vec::new(), &mut forests);
        for children in forests {
            let density = n as f64 * children.iter().map(|&k| trees[k].density).product::<f64>();
            trees.push(RootedTree {
                order: n,
                density,
                children,
            });
        }
    }
    trees
}

/// non-decreasing index lists into `trees` whose orders add up to `remaining`;
/// each multiset of subtrees is produced once
fn forests_of_order(
    trees: &[RootedTree],
    remaining: usize,
    first: usize,
    current: &mut Vec<usize>,
    out: &mut Vec<Vec<usize>>,
) {
    if remaining == 0 {
        out.push(current.clone());
        return;
    }
    for k in first..trees.len() {
        if trees[k].order <= remaining {
            current.push(k);
            forests_of_order(trees, remaining - trees[k].order, k, current, out);
            current.pop();
        }
    }
}

/// Methods of the Lyness experiment, in the order they are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, Display)]
pub enum RKMethod {
    FE,
    Mid22,
    MTE22,
    SSP22,
    SSP22star,
    Heun33,
    SSP33,
    RK44,
    Merson43,
    SSP104,
    Fehlberg45,
    DP5,
    BS5,
    SSP75,
    SSP85,
    SSP95,
    CMR6,
    PD8,
}

impl RKMethod {
    pub fn all() -> Vec<RKMethod> {
        RKMethod::iter().collect()
    }

    pub fn from_name(name: &str) -> Result<RKMethod, UnknownMethod> {
        RKMethod::from_str(name.trim()).map_err(|_| UnknownMethod(name.trim().to_string()))
    }

    pub fn full_name(&self) -> &'static str {
        match self {
            RKMethod::FE => "Forward Euler",
            RKMethod::Mid22 => "Midpoint Runge-Kutta",
            RKMethod::MTE22 => "Minimal Truncation Error 22",
            RKMethod::SSP22 => "SSPRK 22",
            RKMethod::SSP22star => "SSPRK 22 star",
            RKMethod::Heun33 => "Heun RK 33",
            RKMethod::SSP33 => "SSPRK 33",
            RKMethod::RK44 => "Classical RK4",
            RKMethod::Merson43 => "Merson RK43",
            RKMethod::SSP104 => "SSPRK 104",
            RKMethod::Fehlberg45 => "Fehlberg RK5(4)6",
            RKMethod::DP5 => "Dormand-Prince RK5(4)7",
            RKMethod::BS5 => "Bogacki-Shampine RK5(4)8",
            RKMethod::SSP75 => "SSPRK 75",
            RKMethod::SSP85 => "SSPRK 85",
            RKMethod::SSP95 => "SSPRK 95",
            RKMethod::CMR6 => "CMR6",
            RKMethod::PD8 => "Prince-Dormand RK8(7)13",
        }
    }

    /// bundled Butcher tableau of the method
    pub fn tableau(&self) -> ButcherTableau {
        let name = self.full_name();
        match self {
            RKMethod::FE => ButcherTableau::explicit(&[], &[1.0], 1, name),
            RKMethod::Mid22 => ButcherTableau::explicit(&[&[1.0 / 2.0]], &[0.0, 1.0], 2, name),
            RKMethod::MTE22 => {
                ButcherTableau::explicit(&[&[2.0 / 3.0]], &[1.0 / 4.0, 3.0 / 4.0], 2, name)
            }
            RKMethod::SSP22 => ButcherTableau::explicit(&[&[1.0]], &[1.0 / 2.0, 1.0 / 2.0], 2, name),
            // third stage is evaluated at the SSP22 update
            RKMethod::SSP22star => ButcherTableau::explicit(
                &[&[1.0], &[1.0 / 2.0, 1.0 / 2.0]],
                &[1.0 / 2.0, 0.0, 1.0 / 2.0],
                2,
                name,
            ),
            RKMethod::Heun33 => ButcherTableau::explicit(
                &[&[1.0 / 3.0], &[0.0, 2.0 / 3.0]],
                &[1.0 / 4.0, 0.0, 3.0 / 4.0],
                3,
                name,
            ),
            RKMethod::SSP33 => ButcherTableau::explicit(
                &[&[1.0], &[1.0 / 4.0, 1.0 / 4.0]],
                &[1.0 / 6.0, 1.0 / 6.0, 2.0 / 3.0],
                3,
                name,
            ),
            RKMethod::RK44 => ButcherTableau::explicit(
                &[&[1.0 / 2.0], &[0.0, 1.0 / 2.0], &[0.0, 0.0, 1.0]],
                &[1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0],
                4,
                name,
            ),
            RKMethod::Merson43 => ButcherTableau::explicit(
                &[
                    &[1.0 / 3.0],
                    &[1.0 / 6.0, 1.0 / 6.0],
                    &[1.0 / 8.0, 0.0, 3.0 / 8.0],
                    &[1.0 / 2.0, 0.0, -3.0 / 2.0, 2.0],
                ],
                &[1.0 / 6.0, 0.0, 0.0, 2.0 / 3.0, 1.0 / 6.0],
                4,
                name,
            ),
            RKMethod::SSP104 => ssp104(name),
            RKMethod::Fehlberg45 => ButcherTableau::explicit(&FEHLBERG_A, &FEHLBERG_B5, 5, name),
            RKMethod::DP5 => ButcherTableau::explicit(&DP5_A, &DP5_B, 5, name),
            RKMethod::BS5 => ButcherTableau::explicit(&BS5_A, &BS5_B, 5, name),
            RKMethod::SSP75 => ButcherTableau::explicit(&SSP75_A, &SSP75_B, 5, name),
            RKMethod::SSP85 => ButcherTableau::explicit(&SSP85_A, &SSP85_B, 5, name),
            RKMethod::SSP95 => ButcherTableau::explicit(&SSP95_A, &SSP95_B, 5, name),
            RKMethod::CMR6 => ButcherTableau::explicit(&CMR6_A, &CMR6_B, 6, name),
            RKMethod::PD8 => ButcherTableau::explicit(&PD8_A, &PD8_B, 8, name),
        }
    }
}

/// ten stage, fourth order SSP method: two runs of five forward Euler stages with step h/6
/// joined by a convex combination
fn ssp104(name: &str) -> ButcherTableau {
    let s = 10;
    let mut a = DMatrix::zeros(s, s);
    for i in 1..s {
        for j in 0..i {
            a[(i, j)] = if i < 5 || j >= 5 { 1.0 / 6.0 } else { 1.0 / 15.0 };
        }
    }
    ButcherTableau::assemble(a, DVector::from_element(s, 1.0 / 10.0), 4, name)
}

/// Runge-Kutta-Fehlberg 4(5): shared stages, fifth order weights
const FEHLBERG_A: [&[f64]; 5] = [
    &[1.0 / 4.0],
    &[3.0 / 32.0, 9.0 / 32.0],
    &[1932.0 / 2197.0, -7200.0 / 2197.0, 7296.0 / 2197.0],
    &[439.0 / 216.0, -8.0, 3680.0 / 513.0, -845.0 / 4104.0],
    &[-8.0 / 27.0, 2.0, -3544.0 / 2565.0, 1859.0 / 4104.0, -11.0 / 40.0],
];
const FEHLBERG_B5: [f64; 6] = [
    16.0 / 135.0,
    0.0,
    6656.0 / 12825.0,
    28561.0 / 56430.0,
    -9.0 / 50.0,
    2.0 / 55.0,
];

/// Dormand-Prince 5(4)7M, fifth order weights (FSAL row)
const DP5_A: [&[f64]; 6] = [
    &[1.0 / 5.0],
    &[3.0 / 40.0, 9.0 / 40.0],
    &[44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0],
    &[19372.0 / 6561.0, -25360.0 / 2187.0, 64448.0 / 6561.0, -212.0 / 729.0],
    &[
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
    ],
    &[
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ],
];
const DP5_B: [f64; 7] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
    0.0,
];

/// Bogacki-Shampine 5(4)8, fifth order weights (FSAL row)
const BS5_A: [&[f64]; 7] = [
    &[1.0 / 6.0],
    &[2.0 / 27.0, 4.0 / 27.0],
    &[183.0 / 1372.0, -162.0 / 343.0, 1053.0 / 1372.0],
    &[68.0 / 297.0, -4.0 / 11.0, 42.0 / 143.0, 1960.0 / 3861.0],
    &[
        597.0 / 22528.0,
        81.0 / 352.0,
        63099.0 / 585728.0,
        58653.0 / 366080.0,
        4617.0 / 20480.0,
    ],
    &[
        174197.0 / 959244.0,
        -30942.0 / 79937.0,
        8152137.0 / 19744439.0,
        666106.0 / 1039181.0,
        -29421.0 / 29068.0,
        482048.0 / 414219.0,
    ],
    &[
        587.0 / 8064.0,
        0.0,
        4440339.0 / 15491840.0,
        24353.0 / 124800.0,
        387.0 / 44800.0,
        2152.0 / 5985.0,
        7267.0 / 94080.0,
    ],
];
const BS5_B: [f64; 8] = [
    587.0 / 8064.0,
    0.0,
    4440339.0 / 15491840.0,
    24353.0 / 124800.0,
    387.0 / 44800.0,
    2152.0 / 5985.0,
    7267.0 / 94080.0,
    0.0,
];

/// fifth order SSP methods with 7, 8 and 9 stages. No explicit method of order five has a
/// positive SSP coefficient with nonnegative coefficients, so these use downwind-biased
/// (negative) entries; in Shu-Osher form every |beta_ij| <= alpha_ij / r with
/// r = 1.7069 (SSP75), 2.1482 (SSP85), 2.6377 (SSP95)
const SSP75_A: [&[f64]; 6] = [
    &[0.2895682752043132],
    &[0.011284868576855817, 0.29638426513409183],
    &[0.04356182073037635, 0.1347325933046264, 0.26632596569792366],
    &[0.043561817895896617, 0.13473260750046515, 0.26632599361729065, 0.5858644841249705],
    &[
        0.038570128518295284,
        0.07795212525498701,
        0.154087994049155,
        0.3389622532158737,
        0.026230647941778724,
    ],
    &[
        0.10825043496605162,
        0.2614518412583741,
        0.08008026839545498,
        0.1774093420742968,
        0.035522056680344645,
        0.25110518171751445,
    ],
];
const SSP75_B: [f64; 7] = [
    0.10606763604053078,
    0.18440797625591418,
    0.10311665062273696,
    0.2275834763879622,
    -0.06248216553299829,
    0.09064258193228189,
    0.3506638442935725,
];

const SSP85_A: [&[f64]; 7] = [
    &[0.3340810044620206],
    &[0.11252526930121302, 0.15679450022277586],
    &[0.2846943070558927, 0.3549099738763629, 0.10376305286164303],
    &[-0.03885632122939783, 0.1271041096586034, 0.3042161563588786, -0.03604034260652253],
    &[
        0.09596447714518778,
        0.13025400202181198,
        0.21283425666540254,
        0.11475849711192537,
        0.2791664177194438,
    ],
    &[
        0.13252700792207428,
        0.19572161622238918,
        0.15762835392758384,
        -0.1395374922742051,
        0.166366412826836,
        0.1583113621087763,
    ],
    &[
        0.12265320134464842,
        0.12457930484455806,
        0.12243126023884883,
        -0.10837993675647781,
        0.12921818363442114,
        0.12296175840299944,
        0.3615684491623275,
    ],
];
const SSP85_B: [f64; 8] = [
    0.1018228310517827,
    0.14762185547379206,
    0.11596230664943852,
    -0.06752002078435396,
    0.1983630290435967,
    0.06519907082336467,
    0.19171754885910566,
    0.24683337888327336,
];

const SSP95_A: [&[f64]; 8] = [
    &[0.24571030886031464],
    &[-0.05945927923506264, 0.19395849054294015],
    &[-0.04260561304328387, 0.13898117334827964, 0.2716608061998845],
    &[-0.04260561304328391, 0.13898117334827936, 0.27166080619988375, 0.37912271598230773],
    &[
        0.015063076094265384,
        0.1310097043553961,
        0.16335111510887612,
        0.22796854388059373,
        0.03554563645308597,
    ],
    &[
        0.04674910959752832,
        0.18180541817766105,
        0.07141481499729302,
        0.16143717958016013,
        0.025176697698374623,
        0.2684649948808254,
    ],
    &[
        0.08098441917821475,
        0.07002066638300031,
        0.0566470055032527,
        0.12805372106020074,
        0.01997042956196034,
        0.21294934447001257,
        0.300724248529718,
    ],
    &[
        0.10104577568188805,
        0.20274889982642513,
        0.052611202644629096,
        0.12132059643768096,
        -0.014926454652853003,
        0.1500701897022037,
        0.21192713758872628,
        0.10330513106087531,
    ],
];
const SSP95_B: [f64; 9] = [
    0.0662537628591907,
    0.1654620567507019,
    0.08476686166928421,
    0.16403690767887696,
    -0.04289114629796236,
    0.17295258280016562,
    0.24424135055836727,
    -0.023374685397171857,
    0.16855230937854757,
];

/// Calvo-Montijano-Randez RK6(5)9FM, sixth order weights (FSAL row)
const CMR6_A: [&[f64]; 8] = [
    &[2.0 / 15.0],
    &[1.0 / 20.0, 3.0 / 20.0],
    &[3.0 / 40.0, 0.0, 9.0 / 40.0],
    &[
        86727015.0 / 196851553.0,
        -60129073.0 / 52624712.0,
        957436434.0 / 1378352377.0,
        83886832.0 / 147842441.0,
    ],
    &[
        -86860849.0 / 45628967.0,
        111022885.0 / 25716487.0,
        108046682.0 / 101167669.0,
        -141756746.0 / 36005461.0,
        73139862.0 / 60170633.0,
    ],
    &[
        77759591.0 / 16096467.0,
        -49252809.0 / 6452555.0,
        -381680111.0 / 51572984.0,
        879269579.0 / 66788831.0,
        -90453121.0 / 33722162.0,
        111179552.0 / 157155827.0,
    ],
    &[
        237564263.0 / 39280295.0,
        -100523239.0 / 10677940.0,
        -265574846.0 / 27330247.0,
        317978411.0 / 18988713.0,
        -124494385.0 / 35453627.0,
        86822444.0 / 100138635.0,
        -12873523.0 / 724232625.0,
    ],
    &[
        17572349.0 / 289262523.0,
        0.0,
        57513011.0 / 201864250.0,
        15587306.0 / 354501571.0,
        71783021.0 / 234982865.0,
        29672000.0 / 180480167.0,
        65567621.0 / 127060952.0,
        -79074570.0 / 210557597.0,
    ],
];
const CMR6_B: [f64; 9] = [
    17572349.0 / 289262523.0,
    0.0,
    57513011.0 / 201864250.0,
    15587306.0 / 354501571.0,
    71783021.0 / 234982865.0,
    29672000.0 / 180480167.0,
    65567621.0 / 127060952.0,
    -79074570.0 / 210557597.0,
    0.0,
];

/// Prince-Dormand RK8(7)13M, eighth order weights
const PD8_A: [&[f64]; 12] = [
    &[1.0 / 18.0],
    &[1.0 / 48.0, 1.0 / 16.0],
    &[1.0 / 32.0, 0.0, 3.0 / 32.0],
    &[5.0 / 16.0, 0.0, -75.0 / 64.0, 75.0 / 64.0],
    &[3.0 / 80.0, 0.0, 0.0, 3.0 / 16.0, 3.0 / 20.0],
    &[
        29443841.0 / 614563906.0,
        0.0,
        0.0,
        77736538.0 / 692538347.0,
        -28693883.0 / 1125000000.0,
        23124283.0 / 1800000000.0,
    ],
    &[
        16016141.0 / 946692911.0,
        0.0,
        0.0,
        61564180.0 / 158732637.0,
        22789713.0 / 633445777.0,
        545815736.0 / 2771057229.0,
        -180193667.0 / 1043307555.0,
    ],
    &[
        39632708.0 / 573591083.0,
        0.0,
        0.0,
        -433636366.0 / 683701615.0,
        -421739975.0 / 2616292301.0,
        100302831.0 / 723423059.0,
        790204164.0 / 839813087.0,
        800635310.0 / 3783071287.0,
    ],
    &[
        246121993.0 / 1340847787.0,
        0.0,
        0.0,
        -37695042795.0 / 15268766246.0,
        -309121744.0 / 1061227803.0,
        -12992083.0 / 490766935.0,
        6005943493.0 / 2108947869.0,
        393006217.0 / 1396673457.0,
        123872331.0 / 1001029789.0,
    ],
    &[
        -1028468189.0 / 846180014.0,
        0.0,
        0.0,
        8478235783.0 / 508512852.0,
        1311729495.0 / 1432422823.0,
        -10304129995.0 / 1701304382.0,
        -48777925059.0 / 3047939560.0,
        15336726248.0 / 1032824649.0,
        -45442868181.0 / 3398467696.0,
        3065993473.0 / 597172653.0,
    ],
    &[
        185892177.0 / 718116043.0,
        0.0,
        0.0,
        -3185094517.0 / 667107341.0,
        -477755414.0 / 1098053517.0,
        -703635378.0 / 230739211.0,
        5731566787.0 / 1027545527.0,
        5232866602.0 / 850066563.0,
        -4093664535.0 / 808688257.0,
        3962137247.0 / 1805957418.0,
        65686358.0 / 487910083.0,
    ],
    &[
        403863854.0 / 491063109.0,
        0.0,
        0.0,
        -5068492393.0 / 434740067.0,
        -411421997.0 / 543043805.0,
        652783627.0 / 914296604.0,
        11173962825.0 / 925320556.0,
        -13158990841.0 / 6184727034.0,
        3936647629.0 / 1978049680.0,
        -160528059.0 / 685178525.0,
        248638103.0 / 1413531060.0,
        0.0,
    ],
];
const PD8_B: [f64; 13] = [
    14005451.0 / 335480064.0,
    0.0,
    0.0,
    0.0,
    0.0,
    -59238493.0 / 1068277825.0,
    181606767.0 / 758867731.0,
    561292985.0 / 797845732.0,
    -1041891430.0 / 1371343529.0,
    760417239.0 / 1151165299.0,
    118820643.0 / 751138087.0,
    -528747749.0 / 2220607170.0,
    1.0 / 4.0,
];

/// Lookup of tableaux with optional per-run replacements
#[derive(Debug, Clone, Default)]
pub struct MethodRegistry {
    overrides: HashMap<RKMethod, ButcherTableau>,
}

impl MethodRegistry {
    pub fn new() -> MethodRegistry {
        MethodRegistry {
            overrides: HashMap::new(),
        }
    }

    pub fn with_overrides(overrides: HashMap<RKMethod, ButcherTableau>) -> MethodRegistry {
        MethodRegistry { overrides }
    }

    pub fn insert_override(&mut self, method: RKMethod, tableau: ButcherTableau) {
        info!(
            "{}: using user supplied tableau ({} stages, order {})",
            method, tableau.stages, tableau.order
        );
        self.overrides.insert(method, tableau);
    }

    pub fn is_overridden(&self, method: RKMethod) -> bool {
        self.overrides.contains_key(&method)
    }

    pub fn load(&self, method: RKMethod) -> ButcherTableau {
        match self.overrides.get(&method) {
            Some(tableau) => tableau.clone(),
            None => method.tableau(),
        }
    }

    /// string lookup, kept for names coming from text input
    pub fn load_by_name(&self, name: &str) -> Result<ButcherTableau, UnknownMethod> {
        Ok(self.load(RKMethod::from_name(name)?))
    }
}
