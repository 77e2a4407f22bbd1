// ------------------------------------------------------------
// Diagnostics: tip divergence between ensemble members, energy,
// CSV logs and (feature "plots") PNG line plots.
// ------------------------------------------------------------

use std::path::Path;

use nalgebra::Vector2;

use crate::config::PhysicalParams;
use crate::dynamics;
use crate::error::{Error, Result};
use crate::trajectory::Trajectory;

/// Distance curve between two ensemble members `(i, j)` with `i < j`.
#[derive(Debug, Clone, PartialEq)]
pub struct TipDistance {
    pub pair: (usize, usize),
    pub distance: Vec<f64>,
}

/// Tip offsets from the fixed hinge (meters) at every sample.
pub fn tip_positions(params: &PhysicalParams, trajectory: &Trajectory) -> Vec<Vector2<f64>> {
    trajectory
        .samples()
        .map(|s| dynamics::positions(params, s.theta1, s.theta2).1)
        .collect()
}

pub fn pairwise_tip_distances(
    params: &PhysicalParams,
    trajectories: &[Trajectory],
) -> Result<Vec<TipDistance>> {
    if let Some(first) = trajectories.first() {
        if trajectories.iter().any(|tr| tr.len() != first.len()) {
            return Err(Error::config("trajectory lengths differ"));
        }
    }

    let tips: Vec<_> = trajectories.iter().map(|tr| tip_positions(params, tr)).collect();

    let mut out = Vec::new();
    for i in 0..tips.len() {
        for j in i + 1..tips.len() {
            let distance = tips[i]
                .iter()
                .zip(&tips[j])
                .map(|(a, b)| (a - b).norm())
                .collect();
            out.push(TipDistance {
                pair: (i, j),
                distance,
            });
        }
    }
    Ok(out)
}

pub fn energy_series(params: &PhysicalParams, trajectory: &Trajectory) -> Vec<f64> {
    trajectory
        .samples()
        .map(|s| dynamics::total_energy(params, &s.state()))
        .collect()
}

// ------------------------------------------------------------
// CSV writers
// ------------------------------------------------------------
fn write_csv(filename: &Path, header: &[String], cols: &[&[f64]]) -> Result<()> {
    let n = cols.first().map_or(0, |c| c.len());
    if cols.iter().any(|c| c.len() != n) {
        return Err(Error::config("CSV: column size mismatch"));
    }

    let io_err = |e: csv::Error| Error::export(filename, e);
    let mut wtr = csv::Writer::from_path(filename).map_err(io_err)?;

    wtr.write_record(header).map_err(io_err)?;
    for r in 0..n {
        wtr.write_record(cols.iter().map(|c| c[r].to_string()))
            .map_err(io_err)?;
    }
    wtr.flush().map_err(|e| Error::export(filename, e))?;
    Ok(())
}

/// `t, theta1, theta1_dot, theta2, theta2_dot, energy` per sample.
pub fn write_trajectory_csv(
    path: &Path,
    params: &PhysicalParams,
    trajectory: &Trajectory,
) -> Result<()> {
    let energy = energy_series(params, trajectory);
    let header: Vec<String> = ["t", "theta1", "theta1_dot", "theta2", "theta2_dot", "energy"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    write_csv(
        path,
        &header,
        &[
            trajectory.t(),
            trajectory.theta1(),
            trajectory.theta1_dot(),
            trajectory.theta2(),
            trajectory.theta2_dot(),
            &energy,
        ],
    )
}

/// `t` followed by one `dist_i_j` column per pair.
pub fn write_distances_csv(path: &Path, t: &[f64], distances: &[TipDistance]) -> Result<()> {
    let mut header = vec!["t".to_string()];
    header.extend(
        distances
            .iter()
            .map(|d| format!("dist_{}_{}", d.pair.0, d.pair.1)),
    );
    let mut cols: Vec<&[f64]> = vec![t];
    cols.extend(distances.iter().map(|d| d.distance.as_slice()));
    write_csv(path, &header, &cols)
}

// ------------------------------------------------------------
// Plot saving (Plotters)
// ------------------------------------------------------------
#[cfg(feature = "plots")]
pub fn save_distance_plot_png(
    filename: &Path,
    title: &str,
    t: &[f64],
    distances: &[TipDistance],
) -> Result<()> {
    use plotters::prelude::*;

    let plot_err = |e: &dyn std::fmt::Display| Error::export(filename, e);

    if t.is_empty() {
        return Err(Error::config("plot: no samples"));
    }
    if distances.iter().any(|d| d.distance.len() != t.len()) {
        return Err(Error::config("plot: t and distance must have the same length"));
    }

    let (w, h) = (2400u32, 1800u32);

    let xmin = t[0];
    let xmax = t[t.len() - 1];
    let ymax = distances
        .iter()
        .flat_map(|d| d.distance.iter().copied())
        .fold(0.0f64, f64::max);
    let ypad = 0.05 * ymax.max(1e-9);

    let root = BitMapBackend::new(filename, (w, h)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| plot_err(&e))?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption(title, ("sans-serif", 76))
        .x_label_area_size(110)
        .y_label_area_size(140)
        .build_cartesian_2d(xmin..xmax, 0.0..ymax + ypad)
        .map_err(|e| plot_err(&e))?;

    chart
        .configure_mesh()
        .x_desc("time (s)")
        .y_desc("tip distance (m)")
        .axis_desc_style(("sans-serif", 60))
        .label_style(("sans-serif", 44))
        .x_labels(10)
        .y_labels(10)
        .bold_line_style(RGBColor(160, 160, 160).stroke_width(2))
        .light_line_style(RGBColor(220, 220, 220).stroke_width(1))
        .draw()
        .map_err(|e| plot_err(&e))?;

    for (k, d) in distances.iter().enumerate() {
        let color = Palette99::pick(k).stroke_width(4);
        chart
            .draw_series(LineSeries::new(
                t.iter().copied().zip(d.distance.iter().copied()),
                color,
            ))
            .map_err(|e| plot_err(&e))?
            .label(format!("{} vs {}", d.pair.0, d.pair.1))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 40, y)], Palette99::pick(k).stroke_width(4)));
    }

    chart
        .configure_series_labels()
        .label_font(("sans-serif", 44))
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| plot_err(&e))?;

    root.present().map_err(|e| plot_err(&e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InitialState, SimulationConfig};
    use crate::integrator::SolverOptions;
    use crate::trajectory::solve;
    use approx::assert_relative_eq;

    fn params() -> PhysicalParams {
        PhysicalParams::new(1.0, 2.0, 1.0, 1.0)
    }

    fn run(theta2_deg: f64) -> Trajectory {
        solve(
            &params(),
            &InitialState::at_rest_degrees(90.0, theta2_deg),
            &SimulationConfig::new(2.0, 21),
            &SolverOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn tip_starts_at_rod_end() {
        let tips = tip_positions(&params(), &run(90.0));
        assert_eq!(tips.len(), 21);
        assert_relative_eq!(tips[0].x, 3.0, epsilon = 1e-12);
        assert_relative_eq!(tips[0].y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn distances_cover_every_pair_once() {
        let trs = [run(90.0), run(89.0), run(88.0)];
        let d = pairwise_tip_distances(&params(), &trs).unwrap();
        let pairs: Vec<_> = d.iter().map(|x| x.pair).collect();
        assert_eq!(pairs, vec![(0, 1), (0, 2), (1, 2)]);
        for curve in &d {
            assert_eq!(curve.distance.len(), 21);
            assert!(curve.distance.iter().all(|v| *v >= 0.0));
        }
        assert!(d[0].distance[0] > 0.0);
    }

    #[test]
    fn identical_members_have_zero_distance() {
        let trs = [run(90.0), run(90.0)];
        let d = pairwise_tip_distances(&params(), &trs).unwrap();
        assert!(d[0].distance.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn trajectory_csv_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traj.csv");
        let tr = run(45.0);
        write_trajectory_csv(&path, &params(), &tr).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["t", "theta1", "theta1_dot", "theta2", "theta2_dot", "energy"]
        );
        let rows: Vec<_> = rdr.records().collect::<std::result::Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 21);
        let last_t: f64 = rows[20][0].parse().unwrap();
        assert_relative_eq!(last_t, 2.0);
    }

    #[test]
    fn distances_csv_names_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dist.csv");
        let trs = [run(90.0), run(89.0)];
        let d = pairwise_tip_distances(&params(), &trs).unwrap();
        write_distances_csv(&path, trs[0].t(), &d).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        assert_eq!(
            rdr.headers().unwrap().iter().collect::<Vec<_>>(),
            vec!["t", "dist_0_1"]
        );
        assert_eq!(rdr.records().count(), 21);
    }

    #[test]
    fn unwritable_csv_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("traj.csv");
        let err = write_trajectory_csv(&path, &params(), &run(45.0)).unwrap_err();
        match &err {
            Error::Export { path: p, .. } => assert!(p.ends_with("traj.csv")),
            other => panic!("expected export error, got {other:?}"),
        }
        assert!(err.to_string().starts_with("failed to write"));
    }

    #[test]
    fn distances_csv_rejects_ragged_columns() {
        let dir = tempfile::tempdir().unwrap();
        let d = TipDistance {
            pair: (0, 1),
            distance: vec![0.0; 3],
        };
        let err = write_distances_csv(&dir.path().join("x.csv"), &[0.0, 1.0], &[d]).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
