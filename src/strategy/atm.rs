use crate::domain::{ContractType, Instrument};

/// Call and put found at the strike nearest to spot.
#[derive(Debug, Clone, PartialEq)]
pub struct AtmSelection {
    pub strike: Option<f64>,
    pub call: Option<Instrument>,
    pub put: Option<Instrument>,
}

impl AtmSelection {
    /// Both legs, or `None` if either side is missing.
    pub fn legs(self) -> Option<(Instrument, Instrument)> {
        match (self.call, self.put) {
            (Some(call), Some(put)) => Some((call, put)),
            _ => None,
        }
    }

    pub fn missing(&self) -> Vec<ContractType> {
        let mut missing = Vec::new();
        if self.call.is_none() {
            missing.push(ContractType::Call);
        }
        if self.put.is_none() {
            missing.push(ContractType::Put);
        }
        missing
    }
}

/// Strike with the smallest distance to `spot`. Equidistant strikes resolve to
/// the lower one.
pub fn atm_strike(spot: f64, chain: &[Instrument]) -> Option<f64> {
    chain
        .iter()
        .map(|instrument| instrument.strike_price)
        .filter(|strike| strike.is_finite())
        .fold(None, |best: Option<(f64, f64)>, strike| {
            let diff = (strike - spot).abs();
            match best {
                None => Some((strike, diff)),
                Some((best_strike, best_diff))
                    if diff < best_diff || (diff == best_diff && strike < best_strike) =>
                {
                    Some((strike, diff))
                }
                keep => keep,
            }
        })
        .map(|(strike, _)| strike)
}

/// Picks the call and the put listed at the ATM strike. Strikes are compared
/// exactly since they are standardized levels from the same feed.
pub fn select_atm(spot: f64, chain: &[Instrument]) -> AtmSelection {
    let Some(strike) = atm_strike(spot, chain) else {
        return AtmSelection {
            strike: None,
            call: None,
            put: None,
        };
    };

    let at_strike = |kind: ContractType| {
        chain
            .iter()
            .find(|i| i.contract_type == kind && i.strike_price == strike)
            .cloned()
    };

    AtmSelection {
        strike: Some(strike),
        call: at_strike(ContractType::Call),
        put: at_strike(ContractType::Put),
    }
}
