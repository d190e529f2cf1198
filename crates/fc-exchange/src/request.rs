//! Requests and request portfolios.
//!
//! A `RequestPortfolio` is everything one agent asks for on one exchange
//! pass.  Its quantity is the total the agent wants; individual requests are
//! the ways it is willing to receive it.  Two optional groupings refine that:
//!
//! | Grouping       | Meaning                                                     |
//! |----------------|-------------------------------------------------------------|
//! | alternatives   | substitutes for one demand (e.g. one fuel assembly offered  |
//! |                | as either UOX or MOX); the portfolio wants their average,   |
//! |                | and the default constraint weights each by qty / average    |
//! | mutual group   | all-or-nothing: every member is filled in full or none is   |

use std::sync::Arc;

use fc_core::{AgentId, FcError, FcResult, PortfolioId, RequestId};
use fc_resource::Resource;

use crate::constraint::{CapacityConstraint, CoeffConverter};

#[derive(Clone, Debug)]
pub struct Request<T: Resource> {
    pub(crate) id:        RequestId,
    pub(crate) portfolio: PortfolioId,
    index:                usize,
    target:               T,
    requester:            AgentId,
    commodity:            String,
    preference:           f64,
    exclusive:            bool,
}

impl<T: Resource> Request<T> {
    /// Exchange-wide id.  `RequestId::INVALID` until the portfolio is
    /// registered with an `ExchangeContext`.
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn portfolio(&self) -> PortfolioId {
        self.portfolio
    }

    /// Position within the owning portfolio.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Untracked description of what is wanted.
    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn qty(&self) -> f64 {
        self.target.quantity()
    }

    pub fn requester(&self) -> AgentId {
        self.requester
    }

    pub fn commodity(&self) -> &str {
        &self.commodity
    }

    pub fn preference(&self) -> f64 {
        self.preference
    }

    pub fn exclusive(&self) -> bool {
        self.exclusive
    }
}

// ── RequestPortfolio ──────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct RequestPortfolio<T: Resource> {
    requester:   Option<AgentId>,
    requests:    Vec<Request<T>>,
    constraints: Vec<CapacityConstraint<T>>,
    mutual:      Vec<Vec<usize>>,
    coeffs:      Vec<f64>,
    qty:         f64,
}

impl<T: Resource> Default for RequestPortfolio<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Resource> RequestPortfolio<T> {
    pub fn new() -> Self {
        Self {
            requester:   None,
            requests:    Vec::new(),
            constraints: Vec::new(),
            mutual:      Vec::new(),
            coeffs:      Vec::new(),
            qty:         0.0,
        }
    }

    /// Add a request and return its index within the portfolio.
    ///
    /// `target` is stored as an untracked copy.  Every request in a portfolio
    /// must come from the same requester (`FcError::Key` otherwise).
    pub fn add_request(
        &mut self,
        target:     &T,
        requester:  AgentId,
        commodity:  impl Into<String>,
        preference: f64,
        exclusive:  bool,
    ) -> FcResult<usize> {
        match self.requester {
            None => self.requester = Some(requester),
            Some(r) if r != requester => {
                return Err(FcError::Key(format!(
                    "request from {requester} added to portfolio of {r}"
                )));
            }
            Some(_) => {}
        }
        let qty = target.quantity();
        if !qty.is_finite() || qty < 0.0 {
            return Err(FcError::Value(format!("request target quantity {qty} is invalid")));
        }
        let index = self.requests.len();
        self.requests.push(Request {
            id: RequestId::INVALID,
            portfolio: PortfolioId::INVALID,
            index,
            target: target.untracked(),
            requester,
            commodity: commodity.into(),
            preference,
            exclusive,
        });
        self.coeffs.push(1.0);
        self.qty += qty;
        Ok(index)
    }

    /// Declare requests as substitutes for a single demand.
    ///
    /// The portfolio quantity counts their average once instead of their sum,
    /// and each gets a default-constraint coefficient of `qty / average`.
    pub fn add_alternatives(&mut self, indices: &[usize]) -> FcResult<()> {
        self.check_indices(indices)?;
        let sum: f64 = indices.iter().map(|&i| self.requests[i].qty()).sum();
        let avg = sum / indices.len() as f64;
        if avg <= 0.0 {
            return Ok(());
        }
        for &i in indices {
            self.coeffs[i] = self.requests[i].qty() / avg;
        }
        self.qty += avg - sum;
        Ok(())
    }

    /// Declare an all-or-nothing group.  A request may belong to at most one.
    pub fn add_mutual_group(&mut self, indices: &[usize]) -> FcResult<()> {
        self.check_indices(indices)?;
        if let Some(&dup) = indices.iter().find(|&&i| self.mutual.iter().any(|g| g.contains(&i))) {
            return Err(FcError::Key(format!("request {dup} is already in a mutual group")));
        }
        let mut group = indices.to_vec();
        group.sort_unstable();
        group.dedup();
        self.mutual.push(group);
        Ok(())
    }

    pub fn add_constraint(&mut self, c: CapacityConstraint<T>) {
        self.constraints.push(c);
    }

    /// Bound total matched quantity by the portfolio quantity, weighting each
    /// request by its coefficient.
    pub fn add_default_constraint(&mut self) {
        let conv = CoeffConverter::new(self.coeffs.clone());
        self.constraints.push(CapacityConstraint::with_converter(self.qty, Arc::new(conv)));
    }

    pub fn requester(&self) -> Option<AgentId> {
        self.requester
    }

    pub fn requests(&self) -> &[Request<T>] {
        &self.requests
    }

    pub fn constraints(&self) -> &[CapacityConstraint<T>] {
        &self.constraints
    }

    pub fn mutual_groups(&self) -> &[Vec<usize>] {
        &self.mutual
    }

    pub fn qty(&self) -> f64 {
        self.qty
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    fn check_indices(&self, indices: &[usize]) -> FcResult<()> {
        if indices.is_empty() {
            return Err(FcError::Value("empty request group".into()));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.requests.len()) {
            return Err(FcError::Key(format!("no request at index {bad}")));
        }
        Ok(())
    }

    pub(crate) fn into_registered(self, id: PortfolioId, first: u32) -> RegisteredRequestPortfolio<T> {
        let requester = self.requester.unwrap_or(AgentId::INVALID);
        let requests = self
            .requests
            .into_iter()
            .enumerate()
            .map(|(i, mut r)| {
                r.id = RequestId(first + i as u32);
                r.portfolio = id;
                Arc::new(r)
            })
            .collect();
        RegisteredRequestPortfolio {
            id,
            requester,
            requests,
            constraints: self.constraints,
            mutual: self.mutual,
            qty: self.qty,
        }
    }
}

/// A portfolio after registration: ids assigned, requests shared.
#[derive(Debug)]
pub struct RegisteredRequestPortfolio<T: Resource> {
    pub id:          PortfolioId,
    pub requester:   AgentId,
    pub requests:    Vec<Arc<Request<T>>>,
    pub constraints: Vec<CapacityConstraint<T>>,
    pub mutual:      Vec<Vec<usize>>,
    pub qty:         f64,
}
