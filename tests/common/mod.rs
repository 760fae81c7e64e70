use annular_field_sim::{AnnularFieldSim, Fields, Params};

pub fn setup_params() -> Params {
    // A dummy small detector so that it can be used in testing;
    // 4 cells per axis, region of interest covers everything.
    Params {
        rmin: 20.0,
        rmax: 80.0,
        z_length: 100.0,
        nr: 4,
        nphi: 4,
        nz: 4,
        roi: None,
        vdrift: 8.0e6,
        weighted_centers: false,
    }
}

pub fn setup_sim() -> AnnularFieldSim {
    let fields = Fields {
        e_z: 400.0,
        ..Fields::default()
    };
    match AnnularFieldSim::new(&setup_params(), &fields) {
        Ok(sim) => sim,
        Err(e) => panic!("test geometry rejected: {}", e),
    }
}
