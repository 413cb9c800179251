//! Cumulative radiation entry point
//!
//! Declares the inputs of a cumulative radiation study, binds all of them
//! to one `incident-radiation` task and publishes the radiation values and
//! the visualization set it produces.

use recipe_engine::{DagDescriptor, InputField, OutputField, RecipeDescriptor, TaskBinding};

use crate::analysis_period::{ANALYSIS_PERIOD_FORMAT, ANALYSIS_PERIOD_PATTERN};
use crate::incident_radiation::{IncidentRadiation, TEMPLATE_ID};

/// Recipe name
pub const RECIPE_NAME: &str = "cumulative-radiation";

/// Name of the single task binding
pub const TASK_NAME: &str = "run-incident-radiation";

/// Default input values
pub mod defaults {
    pub const NORTH: i64 = 0;
    pub const BALANCE_TEMP: f64 = 16.0;
    pub const GROUND_REFLECTANCE: f64 = 0.2;
    pub const OFFSET_DIST: f64 = 0.01;
    pub const RUN_PERIOD: &str = "1/1 to 12/31 between 0 and 23 @1";
}

/// Published output paths, relative to the run folder
pub const RADIATION_VALUES_PATH: &str = "radiation.json";
pub const VISUALIZATION_SET_PATH: &str = "visualization/viz.vsf";

/// Cumulative radiation entry point
pub struct CumulativeRadiationEntryPoint;

impl RecipeDescriptor for CumulativeRadiationEntryPoint {
    fn descriptor() -> DagDescriptor {
        DagDescriptor::new(RECIPE_NAME, "Cumulative Radiation entry point.")
            .input(
                InputField::integer("north", "An angle for north direction. Default is 0.")
                    .with_default(defaults::NORTH)
                    .with_range(0.0, 360.0),
            )
            .input(
                InputField::boolean(
                    "high_sky_density",
                    "A boolean to indicate if a sky with high density should be used.",
                )
                .with_default(false),
            )
            .input(
                InputField::boolean(
                    "average_irradiance",
                    "A boolean to display the radiation results in units of average \
                     irradiance (W/m2) over the time period instead of units of cumulative \
                     radiation (kWh/m2).",
                )
                .with_default(false),
            )
            .input(
                InputField::boolean(
                    "radiation_benefit",
                    "Check to run a radiation benefit study that weighs helpful \
                     winter-time radiation against harmful summer-time radiation.",
                )
                .with_default(false),
            )
            .input(
                InputField::number(
                    "balance_temp",
                    "Number for the balance temperature in (C) around which radiation \
                     switches from being helpful to harmful. Hours where the temperature is \
                     below this will contribute positively to the benefit (eg. passive solar \
                     heating) while hours above this temperature will contribute negatively \
                     (eg. increased cooling load). This should usually be the balance \
                     temperature of the building being studied.",
                )
                .with_default(defaults::BALANCE_TEMP)
                .with_range(2.0, 26.0),
            )
            .input(
                InputField::number(
                    "ground_reflectance",
                    "Number between 0 and 1 for the average ground reflectance. This is \
                     used to build an emissive ground hemisphere that influences points with \
                     an unobstructed view to the ground.",
                )
                .with_default(defaults::GROUND_REFLECTANCE)
                .with_range(0.0, 1.0),
            )
            .input(
                InputField::number(
                    "offset_dist",
                    "Number in model units for the distance to move points from the \
                     surfaces of the input geometry.",
                )
                .with_default(defaults::OFFSET_DIST)
                .with_range(0.001, 1.0),
            )
            .input(
                InputField::string(
                    "run_period",
                    "Analysis period as a string. The string must be formatted as \
                     {start-month}/{start-day} to {end-month}/{end-day} between \
                     {start-hour} and {end-hour} @{time-step} Default is 1/1 to 12/31 \
                     between 0 and 23 @1 for the whole year.",
                )
                .with_default(defaults::RUN_PERIOD)
                .with_pattern(ANALYSIS_PERIOD_PATTERN)
                .with_format(ANALYSIS_PERIOD_FORMAT),
            )
            .input(
                InputField::file("epw", "Path to epw weather file.")
                    .with_extensions(["epw"])
                    .with_path("weather.epw"),
            )
            .input(
                InputField::file(
                    "study_mesh",
                    "Path to a JSON file for input study mesh in Ladybug Geometry format.",
                )
                .with_path("input_geo.json"),
            )
            .input(
                InputField::file(
                    "context_mesh",
                    "Path to a JSON file for input context mesh in Ladybug Geometry format.",
                )
                .with_path("context_geo.json")
                .optional(),
            )
            .input(
                InputField::boolean(
                    "display_context",
                    "Boolean to note whether the context geometry should be included in \
                     the output visualization.",
                )
                .with_default(false),
            )
            .task(
                TaskBinding::new(TASK_NAME, TEMPLATE_ID)
                    .bind_inputs(IncidentRadiation::PARAMETERS)
                    .publish(IncidentRadiation::OUTPUT_RADIATION_VALUES, RADIATION_VALUES_PATH)
                    .publish(
                        IncidentRadiation::OUTPUT_VISUALIZATION_SET,
                        VISUALIZATION_SET_PATH,
                    ),
            )
            .output(OutputField::file(
                "radiation_values",
                RADIATION_VALUES_PATH,
                "Hourly results for direct sun hours.",
            ))
            .output(OutputField::file(
                "visualization_set",
                VISUALIZATION_SET_PATH,
                "Direct sun hours visualization.",
            ))
    }
}

inventory::submit!(recipe_engine::DescriptorFn(
    CumulativeRadiationEntryPoint::descriptor
));
