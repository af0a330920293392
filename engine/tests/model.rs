use engine::config::InitMode;
use engine::model::ModelState;
use engine::progress::PlotRequest;
use engine::snapshots::MemorySink;
use engine::topology::BoundaryMode;
use engine::{BedModel, EngineError, SimParams};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-12
}

fn model(params: SimParams) -> BedModel {
    match BedModel::new(params, 1) {
        Ok(m) => m,
        Err(e) => panic!("model construction failed: {e}"),
    }
}

#[test]
fn inert_bed_is_a_fixed_point() {
    let mut m = model(SimParams::default());
    let grids = |m: &BedModel| {
        [&m.surf, &m.ice, &m.bsmt, &m.iceload, &m.basal_pres, &m.basal_def, &m.contact]
            .map(|r| r.data().to_vec())
    };
    let before = grids(&m);

    let mut sink = MemorySink::default();
    for t in 0..3 {
        let totals = m.run(t, &mut sink).unwrap();
        assert_eq!(totals.q_ad, 0.0);
        assert_eq!(totals.q_squish(), 0.0);
        assert_eq!(totals.settle_count, 0);
    }
    assert_eq!(grids(&m), before);
    assert_eq!(sink.states.len(), 3);
}

#[test]
fn ice_advection_blends_with_west_neighbour() {
    let params = SimParams { ydim: 2, xdim: 4, ice_advection: 0.5, ..Default::default() };
    let mut m = model(params);
    for y in 0..2 {
        for x in 0..4 {
            m.ice.set(y, x, 20.0 + 2.0 * x as f64 + y as f64);
            m.iceload.set(y, x, 1.0 + x as f64);
        }
    }
    let ice0 = m.ice.clone();
    let load0 = m.iceload.clone();

    m.move_ice();

    for y in 0..2 {
        for x in 0..4usize {
            let xw = x.saturating_sub(1);
            assert!(close(m.ice.get(y, x), 0.5 * ice0.get(y, xw) + 0.5 * ice0.get(y, x)));
            assert!(close(m.iceload.get(y, x), 0.5 * load0.get(y, xw) + 0.5 * load0.get(y, x)));
            // Ice lifted off a bed at zero background pressure leaves a cavity.
            assert!(!m.in_contact(y, x));
            assert_eq!(m.basal_pres.get(y, x), 0.0);
        }
    }
    // Per row: half of the easternmost load leaves, half of the mirrored western load enters.
    assert!(close(m.period_totals().iceload_boundary_loss, 2.0 * (0.5 * 4.0 - 0.5 * 1.0)));
}

#[test]
fn pressure_follows_deformation() {
    let params = SimParams { global_basal_pres: 1.0, viscosity: 2.0, ..Default::default() };
    let mut m = model(params);
    m.surf.set(1, 1, 10.5);

    m.move_ice();

    assert!(m.in_contact(1, 1));
    assert!(close(m.basal_def.get(1, 1), 0.5));
    assert!(close(m.basal_pres.get(1, 1), 1.0 + 0.5 * 2.0));
    assert!(close(m.basal_pres.get(0, 0), 1.0));
    assert_eq!(m.ice.get(1, 1), 10.5);
    assert!(close(m.zero_elev.get(1, 1), 10.0 - 0.5));
}

#[test]
fn squish_flattens_a_bump() {
    let params = SimParams { ydim: 1, xdim: 3, global_basal_pres: 1.0, q_squish_coef: 1.0, ..Default::default() };
    let mut m = model(params);
    m.surf.set(0, 1, 10.4);

    m.move_ice();
    m.squish_sediment().unwrap();

    // Flux is capped at an eighth of the deformation difference per neighbour.
    assert!((m.surf.get(0, 0) - 10.05).abs() < 1e-12);
    assert!((m.surf.get(0, 1) - 10.3).abs() < 1e-12);
    assert!((m.surf.get(0, 2) - 10.05).abs() < 1e-12);
    assert!((m.surf.sum() - 30.4).abs() < 1e-12);
    for x in 0..3 {
        assert_eq!(m.ice.get(0, x), m.surf.get(0, x));
    }
    let q = m.period_totals();
    assert!((q.q_sq_e - 0.05).abs() < 1e-12);
    assert!((q.q_sq_w - 0.05).abs() < 1e-12);
    assert_eq!(q.q_sq_n + q.q_sq_s, 0.0);
}

#[test]
fn advection_moves_east_and_leaves_the_open_edge() {
    let params = SimParams {
        ydim: 1,
        xdim: 3,
        global_basal_pres: 1.0,
        q_advection_global: 0.1,
        ..Default::default()
    };
    let mut m = model(params);
    m.bsmt.set(0, 1, 9.95);

    m.move_ice();
    m.advect_entrainment();
    m.apply_dsurf();

    // The middle cell can only give up its 0.05 of cover.
    assert!((m.surf.get(0, 0) - 9.9).abs() < 1e-12);
    assert!((m.surf.get(0, 1) - 10.05).abs() < 1e-12);
    assert!((m.surf.get(0, 2) - 9.95).abs() < 1e-12);
    let q = m.period_totals();
    assert!((q.advection_boundary_loss - 0.1).abs() < 1e-12);
    assert!((q.q_ad - 0.25).abs() < 1e-12);
}

#[test]
fn entrainment_never_overdraws_the_ice_load() {
    let mut params = SimParams { global_basal_pres: 1.0, init_iceload: 0.3, ..Default::default() };
    params.entrainment.zero = -1.0;
    let mut m = model(params);

    m.move_ice();
    m.advect_entrainment();
    m.apply_dsurf();

    assert!(m.iceload.data().iter().all(|&l| l == 0.0));
    assert!(m.surf.data().iter().all(|&s| (s - 10.3).abs() < 1e-12));
    assert!((m.period_totals().q_distrain - 9.0 * 0.3).abs() < 1e-12);
}

#[test]
fn abrasion_splits_between_bed_and_ice() {
    let mut params = SimParams {
        global_basal_pres: 2.0,
        init: InitMode::Flat { basement_elev: 10.0, sedfill_elev: 10.0, erodibility: 0.0 },
        ..Default::default()
    };
    params.abrasion.from_n_slope = 0.1;
    params.abrasion.from_n_zero = 0.05;
    params.abrasion.global_erodibility = 1.0;
    params.abrasion.iceload_return_fraction = 0.25;
    let mut m = model(params);

    m.move_ice();
    m.erode_basement();

    for (i, &b) in m.bsmt.data().iter().enumerate() {
        assert!((b - 9.75).abs() < 1e-12);
        assert!((m.surf.data()[i] - (9.75 + 0.75 * 0.25)).abs() < 1e-12);
        assert!((m.iceload.data()[i] - 0.0625).abs() < 1e-12);
    }
    assert!((m.period_totals().abrasion - 9.0 * 0.25).abs() < 1e-12);
}

#[test]
fn covered_basement_is_not_abraded() {
    let mut params = SimParams { global_basal_pres: 2.0, ..Default::default() };
    params.abrasion.from_n_zero = 1.0;
    params.abrasion.global_erodibility = 1.0;
    let mut m = model(params);
    m.move_ice();
    m.erode_basement();
    assert!(m.bsmt.data().iter().all(|&b| b == 0.0));
    assert_eq!(m.period_totals().abrasion, 0.0);
}

#[test]
fn bleeds_stop_at_their_floors() {
    let mut params = SimParams {
        init: InitMode::Flat { basement_elev: 0.0, sedfill_elev: 0.2, erodibility: 0.0 },
        init_iceload: 2.0,
        ..Default::default()
    };
    params.bleed.surf = 0.3;
    params.bleed.iceload = 0.5;
    params.bleed.iceload_diffusive = true;
    let mut m = model(params);

    m.surf_bleed();
    m.iceload_bleed();

    assert!(m.surf.data().iter().all(|&s| s == 0.0));
    assert!(m.iceload.data().iter().all(|&l| l == 1.0));
    let q = m.period_totals();
    assert!((q.surf_bleed - 1.8).abs() < 1e-12);
    assert!((q.iceload_bleed - 9.0).abs() < 1e-12);
}

#[test]
fn settling_lifts_ice_onto_a_raised_surface() {
    let mut m = model(SimParams::default());
    m.surf.set(0, 0, 10.5);
    m.contact.set(1, 1, 0.0);
    m.surf.set(1, 1, 11.0);

    m.settle_ice();

    assert_eq!(m.ice.get(0, 0), 10.5);
    assert!(close(m.basal_def.get(0, 0), 0.5));
    assert_eq!(m.ice.get(1, 1), 11.0);
    assert!(m.in_contact(1, 1));
    assert_eq!(m.basal_def.get(1, 1), 0.0);
    assert_eq!(m.period_totals().settle_count, 2);
}

#[test]
fn same_seed_same_trajectory() {
    let params = SimParams {
        ydim: 5,
        xdim: 6,
        global_basal_pres: 1.0,
        q_advection_global: 0.01,
        q_advection_stochasticity: 0.8,
        q_squish_coef: 0.5,
        ..Default::default()
    };
    let run = |seed: u64| {
        let mut m = BedModel::new(params.clone(), seed).unwrap();
        m.surf.set(2, 2, 10.8);
        m.surf.set(3, 4, 9.7);
        let mut sink = MemorySink::default();
        for t in 0..10 {
            m.run(t, &mut sink).unwrap();
        }
        m.surf.data().to_vec()
    };
    assert_eq!(run(7), run(7));
    assert_ne!(run(7), run(8));
}

#[test]
fn lifecycle_is_enforced() {
    let mut m = model(SimParams::default());
    let mut sink = MemorySink::default();
    assert_eq!(m.state(), ModelState::Ready);
    m.run(0, &mut sink).unwrap();
    assert_eq!(m.state(), ModelState::Running);
    m.finalize(1, &mut sink).unwrap();
    assert_eq!(m.state(), ModelState::Finalized);

    assert!(matches!(m.run(1, &mut sink), Err(EngineError::Lifecycle(_))));
    let err = m.finalize(1, &mut sink).unwrap_err();
    assert!(matches!(err, EngineError::Lifecycle(_)));
    assert_eq!(err.exit_code(), 15);
}

#[test]
fn snapshots_follow_the_output_interval() {
    let params = SimParams { output_interval: 3, ..Default::default() };
    let mut m = model(params);
    let mut sink = MemorySink::default();
    for t in 0..8 {
        m.run(t, &mut sink).unwrap();
    }
    m.finalize(8, &mut sink).unwrap();

    let steps: Vec<u64> = sink.states.iter().map(|(t, _)| *t).collect();
    assert_eq!(steps, [0, 3, 6, 8]);
    assert_eq!(sink.reports.iter().map(|r| r.t).collect::<Vec<_>>(), steps);
    assert_eq!(sink.plots, [PlotRequest::AllImages, PlotRequest::FinalAnalyses]);
}

#[test]
fn on_the_fly_plots_every_snapshot() {
    let mut params = SimParams { output_interval: 2, ..Default::default() };
    params.progress.on_the_fly = true;
    let mut m = model(params);
    let mut sink = MemorySink::default();
    for t in 0..4 {
        m.run(t, &mut sink).unwrap();
    }
    m.finalize(4, &mut sink).unwrap();
    assert_eq!(
        sink.plots,
        [PlotRequest::Step(0), PlotRequest::Step(2), PlotRequest::Step(4), PlotRequest::FinalAnalyses]
    );
}

#[test]
fn reports_partition_the_step_fluxes() {
    let params = SimParams {
        ydim: 4,
        xdim: 4,
        global_basal_pres: 1.0,
        q_advection_global: 0.01,
        q_advection_stochasticity: 0.5,
        output_interval: 2,
        ..Default::default()
    };
    let mut m = model(params);
    let mut sink = MemorySink::default();
    let mut stepped = 0.0;
    for t in 0..7 {
        stepped += m.run(t, &mut sink).unwrap().q_ad;
    }
    let reported: f64 = sink.reports.iter().map(|r| r.totals.q_ad).sum();
    assert!(stepped > 0.0);
    assert!((stepped - reported - m.period_totals().q_ad).abs() < 1e-9);
}

#[test]
fn report_statistics_describe_the_bed() {
    let mut m = model(SimParams { global_basal_pres: 1.0, ..Default::default() });
    m.surf.set(0, 0, 12.0);
    let r = m.status_report(5);
    assert_eq!(r.t, 5);
    assert_eq!(r.surf.max, 12.0);
    assert_eq!(r.bsmt.mean, 0.0);
    assert_eq!(r.contact_mean, 1.0);
    assert!((r.total_bedsed - 92.0).abs() < 1e-12);
    assert_eq!(r.csv_row().split(',').count(), engine::ledger::STATUS_COLUMNS.len());
}

#[test]
fn existing_init_loads_grids() {
    let dir = tempfile::tempdir().unwrap();
    let header = "ncols 4\nnrows 3\nxllcorner 0\nyllcorner 0\ncellsize 1\nNODATA_value -9999\n";
    let write = |name: &str, body: &str| {
        let path = dir.path().join(name);
        std::fs::write(&path, format!("{header}{body}")).unwrap();
        path
    };
    let surf_file = write("surf.asc", "5 5 5 5\n4 4 4 4\n3 3 3 3\n");
    let bsmt_file = write("bsmt.asc", "1 1 1 1\n1 1 1 1\n1 1 1 1\n");
    let erodibility_file = write("erod.asc", "0 0 0 0\n0 0.5 0 0\n0 0 0 0\n");

    let params = SimParams {
        ydim: 3,
        xdim: 4,
        init: InitMode::Existing { surf_file, bsmt_file, erodibility_file },
        ..Default::default()
    };
    let m = model(params.clone());
    assert_eq!(m.surf.get(2, 0), 5.0);
    assert_eq!(m.surf.get(0, 3), 3.0);
    assert_eq!(m.erodibility.get(1, 1), 0.5);
    assert_eq!(m.ice.data(), m.surf.data());

    let wrong = SimParams { ydim: 4, ..params };
    match BedModel::new(wrong, 1) {
        Err(EngineError::DimensionMismatch { expected_y: 4, found_y: 3, .. }) => {}
        Err(e) => panic!("unexpected error {e}"),
        Ok(_) => panic!("mismatched grid accepted"),
    }
}

#[test]
fn invalid_parameters_are_rejected_before_allocation() {
    let params = SimParams { ice_advection: 2.0, ..Default::default() };
    match BedModel::new(params, 1) {
        Err(EngineError::Config { key, .. }) => assert_eq!(key, "ice_advection"),
        Err(e) => panic!("unexpected error {e}"),
        Ok(_) => panic!("unstable configuration accepted"),
    }
}

#[test]
fn periodic_bed_keeps_advected_mass() {
    let params = SimParams {
        ydim: 3,
        xdim: 5,
        global_basal_pres: 1.0,
        q_advection_global: 0.02,
        boundaries_ns: BoundaryMode::Periodic,
        boundaries_ew: BoundaryMode::Periodic,
        ..Default::default()
    };
    let mut m = model(params);
    let before = m.surf.sum();
    let mut sink = MemorySink::default();
    for t in 0..5 {
        let q = m.run(t, &mut sink).unwrap();
        assert_eq!(q.advection_boundary_loss, 0.0);
    }
    assert!((m.surf.sum() - before).abs() < 1e-9);
}

#[test]
fn check_state_rejects_unphysical_grids() {
    type Corrupt = fn(&mut BedModel);
    let cases: [(&str, Corrupt); 4] = [
        ("surface below basement", |m| m.surf.set(1, 1, -1.0)),
        ("ice below surface", |m| m.ice.set(1, 1, 5.0)),
        ("NaN ice load", |m| m.iceload.set(0, 0, f64::NAN)),
        ("negative ice load", |m| m.iceload.set(0, 0, -1.0)),
    ];
    for (what, corrupt) in cases {
        let mut m = model(SimParams::default());
        assert!(m.check_state().is_ok());
        corrupt(&mut m);
        match m.check_state() {
            Err(e @ EngineError::InvariantViolation(_)) => assert_eq!(e.exit_code(), 11, "{what}"),
            other => panic!("{what}: expected an invariant violation, got {other:?}"),
        }
    }
}

/// One row: a low contact cell, a pressure high, and a cavity with 0.5 of room under its ice.
fn cavity_row(squish_coef: f64) -> BedModel {
    let params = SimParams {
        ydim: 1,
        xdim: 3,
        global_basal_pres: 1.0,
        q_squish_coef: squish_coef,
        ..Default::default()
    };
    let mut m = model(params);
    for (x, s) in [9.5, 10.4, 8.5].into_iter().enumerate() {
        m.surf.set(0, x, s);
    }
    m.move_ice();
    assert!(m.in_contact(0, 0) && m.in_contact(0, 1));
    assert!(!m.in_contact(0, 2));
    assert!(close(m.ice.get(0, 2), 9.0));
    m
}

#[test]
fn squish_fills_a_cavity_to_its_ceiling() {
    let mut m = cavity_row(1.0);
    let sum = m.surf.sum();

    m.squish_sediment().unwrap();

    let t = m.period_totals();
    // Pressure gradient 1.4 towards the cavity, capped by its room.
    assert!(close(t.q_sq_e, 0.5));
    // 0.125 of the deformation difference with the western contact cell.
    assert!(close(t.q_sq_w, 0.125 * 0.9));
    assert_eq!(t.q_sq_n + t.q_sq_s, 0.0);
    assert_eq!(t.squish_boundary_loss, 0.0);
    assert!(t.squish_ceiling_clip.abs() < 1e-10);

    assert!(close(m.surf.get(0, 2), 9.0));
    assert_eq!(m.surf.get(0, 2), m.ice.get(0, 2));
    // Filled, flipped to contact, then resolved back to a zero-pressure cavity.
    assert!(!m.in_contact(0, 2));
    assert_eq!(m.basal_pres.get(0, 2), 0.0);
    assert!(close(m.surf.get(0, 1), 10.4 - 0.5 - 0.1125));
    assert!((m.surf.sum() - sum).abs() < 1e-12);
}

#[test]
fn near_full_cavity_is_clipped_to_its_ceiling() {
    // Flux falls 5e-11 short of the room, inside the fill tolerance.
    let mut m = cavity_row((0.5 - 5.0e-11) / 1.4);
    let sum = m.surf.sum();

    m.squish_sediment().unwrap();

    let clip = m.period_totals().squish_ceiling_clip;
    assert!(clip < 0.0 && clip > -1.0e-10, "clip {clip}");
    assert_eq!(m.surf.get(0, 2), m.ice.get(0, 2));
    assert!(!m.in_contact(0, 2));
    // The clip is the only change in total sediment.
    assert!((m.surf.sum() - sum - clip).abs() < 1e-12);
}

#[test]
fn squish_below_the_zero_level_is_fatal() {
    let mut m = cavity_row(1.0);
    m.zero_elev.set(0, 1, 20.0);

    match m.squish_sediment() {
        Err(e @ EngineError::InvariantViolation(_)) => assert_eq!(e.exit_code(), 11),
        other => panic!("expected an invariant violation, got {other:?}"),
    }
}
