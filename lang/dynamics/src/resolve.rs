use crate::err::ResolveError;

/// What a parameter slot received: one payload, or a caller-surplus
/// group to be folded into a right-nested cons chain.
#[derive(Clone, Debug, PartialEq)]
pub enum Bound<T> {
    Single(T),
    Fold(Vec<T>),
}

/// Pair caller arguments with parameter slots by particle.
///
/// Generic over the payload so the generator can run it over compiled
/// element ops and the evaluator over values. Parameter groups
/// (adjacent slots sharing a particle) are processed right to left;
/// each scans the arguments right to left for the nearest unused
/// particle match, then extends leftward over adjacent unused
/// と-tagged arguments (the conjunction), except while a と-tagged
/// parameter group further left still awaits them. A group with no
/// particle match may consume the single untagged implicit argument,
/// once. A caller group larger than the parameter group folds its
/// leftmost surplus into the group's first slot; a smaller one is an
/// unsupported expansion.
pub fn resolve<T: Clone>(
    params: &[String],
    args: &[(T, String)],
    implicit: Option<T>,
) -> Result<Vec<Bound<T>>, ResolveError> {
    let mut out: Vec<Option<Bound<T>>> = vec![None; params.len()];
    let mut used = vec![false; args.len()];
    let mut implicit = implicit;
    let mut hi = params.len();
    while hi > 0 {
        let particle = &params[hi - 1];
        let mut lo = hi - 1;
        while lo > 0 && params[lo - 1] == *particle {
            lo -= 1;
        }
        let group_len = hi - lo;
        let nearest =
            (0..args.len()).rev().find(|&j| !used[j] && args[j].1 == *particle);
        let payloads: Vec<T> = match nearest {
            | Some(j) => {
                used[j] = true;
                let mut k = j;
                // adjacent と-tagged arguments belong to this group
                // unless a と-tagged parameter to the left claims them
                let extend = *particle == "と"
                    || !params[..lo].iter().any(|p| p == "と");
                if extend {
                    while k > 0 && !used[k - 1] && args[k - 1].1 == "と" {
                        k -= 1;
                        used[k] = true;
                    }
                }
                args[k..=j].iter().map(|(t, _)| t.clone()).collect()
            }
            | None => match implicit.take() {
                | Some(t) => vec![t],
                | None => {
                    return Err(ResolveError::Unbound {
                        particle: particle.clone(),
                        expected: params.join("・"),
                        supplied: supplied_particles(args),
                    });
                }
            },
        };
        if payloads.len() == group_len {
            for (slot, t) in (lo..hi).zip(payloads) {
                out[slot] = Some(Bound::Single(t));
            }
        } else if payloads.len() > group_len {
            let surplus = payloads.len() - group_len + 1;
            let mut iter = payloads.into_iter();
            out[lo] = Some(Bound::Fold(iter.by_ref().take(surplus).collect()));
            for (slot, t) in (lo + 1..hi).zip(iter) {
                out[slot] = Some(Bound::Single(t));
            }
        } else {
            return Err(ResolveError::Expansion { particle: particle.clone() });
        }
        hi = lo;
    }
    if let Some(unused) = (0..args.len()).find(|&j| !used[j]) {
        log::trace!("argument tagged `{}` unused by callee", args[unused].1);
    }
    Ok(out.into_iter().map(|b| b.unwrap()).collect())
}

fn supplied_particles<T>(args: &[(T, String)]) -> String {
    args.iter().map(|(_, p)| p.as_str()).collect::<Vec<_>>().join("・")
}
