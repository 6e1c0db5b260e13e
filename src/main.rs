fn main() {
    imu_trial_import::cli::run();
}
