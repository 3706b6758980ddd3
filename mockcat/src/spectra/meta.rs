//! Per-object inputs handed to spectral synthesis

use crate::catalog::ObjectClass;

/// Template choice and echoed catalog fields for a batch of objects
///
/// Optional columns are present only for classes whose templates use them:
/// `vdisp` for galaxies, `teff`/`logg`/`feh` for stars, `subtype` for white
/// dwarfs and quasars.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateMeta {
    pub objtype: ObjectClass,
    pub template_id: Vec<i64>,
    pub seed: Vec<u32>,
    pub redshift: Vec<f64>,
    pub mag: Option<Vec<f64>>,
    pub vdisp: Option<Vec<f64>>,
    pub teff: Option<Vec<f64>>,
    pub logg: Option<Vec<f64>>,
    pub feh: Option<Vec<f64>>,
    pub subtype: Option<Vec<String>>,
}

fn take<T: Clone>(values: &[T], rows: &[usize]) -> Vec<T> {
    rows.iter().map(|&i| values[i].clone()).collect()
}

impl TemplateMeta {
    pub fn len(&self) -> usize {
        self.template_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.template_id.is_empty()
    }

    /// Metadata of the selected rows, in the order of `rows`
    pub fn take(&self, rows: &[usize]) -> TemplateMeta {
        let opt = |v: &Option<Vec<f64>>| v.as_deref().map(|v| take(v, rows));
        TemplateMeta {
            objtype: self.objtype,
            template_id: take(&self.template_id, rows),
            seed: take(&self.seed, rows),
            redshift: take(&self.redshift, rows),
            mag: opt(&self.mag),
            vdisp: opt(&self.vdisp),
            teff: opt(&self.teff),
            logg: opt(&self.logg),
            feh: opt(&self.feh),
            subtype: self.subtype.as_deref().map(|v| take(v, rows)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_rows() {
        let meta = TemplateMeta {
            objtype: ObjectClass::Wd,
            template_id: vec![1, 2, 3],
            seed: vec![10, 20, 30],
            redshift: vec![0.0, 0.1, 0.2],
            mag: Some(vec![18.0, 19.0, 20.0]),
            vdisp: None,
            teff: Some(vec![1e4, 2e4, 3e4]),
            logg: Some(vec![8.0, 8.1, 8.2]),
            feh: None,
            subtype: Some(vec!["DA".into(), "DB".into(), "DA".into()]),
        };
        let sub = meta.take(&[2, 0]);
        assert_eq!(sub.template_id, vec![3, 1]);
        assert_eq!(sub.seed, vec![30, 10]);
        assert_eq!(sub.teff, Some(vec![3e4, 1e4]));
        assert_eq!(sub.subtype, Some(vec!["DA".to_string(), "DA".to_string()]));
        assert!(sub.vdisp.is_none());
        assert_eq!(sub.len(), 2);
    }
}
