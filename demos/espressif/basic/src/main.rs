#![no_std]
#![no_main]

use defmt::{error, info};
use embedded_hal_bus::spi::ExclusiveDevice;
use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig};
use esp_hal::main;
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use esp_hal::spi::Mode;
use esp_hal::time::{Duration, Instant, Rate};
use mpu6000::params::SamplingMode;
use mpu6000::{Config, Mpu6000};
use {panic_rtt_target as _, rtt_target as _};

esp_bootloader_esp_idf::esp_app_desc!();

#[main]
fn main() -> ! {
    rtt_target::rtt_init_defmt!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);
    let mut delay = Delay::new();

    // 1 MHz is the register-write limit.
    let spi_bus = Spi::new(
        peripherals.SPI2,
        SpiConfig::default()
            .with_frequency(Rate::from_mhz(1))
            .with_mode(Mode::_3),
    )
    .unwrap()
    .with_sck(peripherals.GPIO6)
    .with_mosi(peripherals.GPIO7)
    .with_miso(peripherals.GPIO2);

    let cs = Output::new(peripherals.GPIO10, Level::High, OutputConfig::default());
    let drdy = Input::new(peripherals.GPIO3, InputConfig::default());
    let spi = ExclusiveDevice::new(spi_bus, cs, Delay::new()).unwrap();

    let imu_config = Config::new()
        .sampling_mode(SamplingMode::Fast)
        .delivery_rate_hz(200)
        .filter_hz(20)
        .build();
    let mut imu = Mpu6000::new_spi_with_data_ready(spi, drdy, imu_config);

    if let Err(e) = imu.init(&mut delay) {
        error!("MPU6000 bring-up failed: {}", defmt::Debug2Format(&e));
        loop {}
    }
    info!("MPU6000 product id {=u8:#x}", imu.product_id().map_or(0, |id| id.0));

    let (mut sampler, mut reader) = imu.split().unwrap();
    let period = Duration::from_micros(u64::from(sampler.period_us()));
    let mut next_tick = Instant::now() + period;
    let mut delivered: u32 = 0;

    loop {
        sampler.tick();

        if reader.update(&mut delay) {
            delivered = delivered.wrapping_add(1);
            if delivered % 200 == 0 {
                info!(
                    "gyro {} rad/s, accel {} m/s^2",
                    reader.gyro(),
                    reader.accel()
                );
            }
            if delivered == 1_000 {
                reader.set_filter_hz(40);
            }
        }

        if !reader.is_healthy() {
            error!("MPU6000 unhealthy after {} errors", reader.consecutive_errors());
            loop {}
        }

        while Instant::now() < next_tick {}
        next_tick = next_tick + period;
    }
}
