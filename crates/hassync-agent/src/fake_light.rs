//! A light that does whatever Home Assistant tells it, plus a presence sensor.
//!
//! Every command is written straight back to the matching state topic. When
//! Home Assistant comes back online the discovery document, state and
//! availability are announced again.

use crate::config::AgentConfig;
use anyhow::{Context, Result};
use hassync_core::codec::{display_marshaler, from_str_unmarshaler};
use hassync_core::{
    join_topic, Handler, RemoteValue, Subscriber, SubscriptionManager, Transport,
    Value, ValueError, WriteOptions, Writer,
};
use hassync_discovery::{
    home_assistant_availability, sensor_attributes, Availability, BinarySensor, ColorMode,
    Component, Components, Device, DiscoveryError, Light, LightOnCommandType, PowerState, Rgb,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

type Attributes = BTreeMap<String, serde_json::Value>;

/// Something Home Assistant asked for.
#[derive(Debug, Clone)]
enum Command {
    Power(PowerState),
    ColorMode(ColorMode),
    Brightness(u32),
    ColorTemperature(u32),
    Rgb(Rgb),
    HomeAssistant(Availability),
}

struct LightCells {
    availability: Arc<Value<Availability>>,
    state: Arc<Value<PowerState>>,
    command: Arc<RemoteValue<PowerState>>,
    color_mode: Arc<Value<ColorMode>>,
    color_mode_command: Arc<RemoteValue<ColorMode>>,
    brightness: Arc<Value<u32>>,
    brightness_command: Arc<RemoteValue<u32>>,
    color_temperature: Arc<Value<u32>>,
    color_temperature_command: Arc<RemoteValue<u32>>,
    rgb: Arc<Value<Rgb>>,
    rgb_command: Arc<RemoteValue<Rgb>>,
}

struct PresenceCells {
    availability: Arc<Value<Availability>>,
    state: Arc<Value<PowerState>>,
}

fn availability() -> Arc<Value<Availability>> {
    Arc::new(Value::with_options(
        "available",
        Some(display_marshaler()),
        WriteOptions::retained(),
    ))
}

fn power_state() -> Arc<Value<PowerState>> {
    Arc::new(Value::with_options(
        "state",
        Some(display_marshaler()),
        WriteOptions::retained(),
    ))
}

/// The demo device.
pub struct FakeLight {
    device: Device,
    discovery_prefix: String,
    light: Component<Light>,
    presence: Component<BinarySensor<Attributes>>,
    light_cells: LightCells,
    presence_cells: PresenceCells,
}

impl FakeLight {
    /// Build the device and its components from `config`.
    #[must_use]
    pub fn new(config: &AgentConfig) -> Self {
        let light_cells = LightCells {
            availability: availability(),
            state: power_state(),
            command: Arc::new(RemoteValue::new("command", from_str_unmarshaler())),
            color_mode: Arc::new(Value::new("color/mode", Some(display_marshaler()))),
            color_mode_command: Arc::new(RemoteValue::new("mode/set", from_str_unmarshaler())),
            brightness: Arc::new(Value::new("brightness", Some(display_marshaler()))),
            brightness_command: Arc::new(RemoteValue::new(
                "brightness/set",
                from_str_unmarshaler(),
            )),
            color_temperature: Arc::new(Value::new(
                "color/temperature",
                Some(display_marshaler()),
            )),
            color_temperature_command: Arc::new(RemoteValue::new(
                "color/temperature/set",
                from_str_unmarshaler(),
            )),
            rgb: Arc::new(Value::new("color/rgb", Some(display_marshaler()))),
            rgb_command: Arc::new(RemoteValue::new("color/rgb/set", from_str_unmarshaler())),
        };

        let platform = Light {
            on_command_type: LightOnCommandType::Last,
            state: Some(Arc::clone(&light_cells.state)),
            command: Some(Arc::clone(&light_cells.command)),
            color_mode: Some(Arc::clone(&light_cells.color_mode)),
            color_mode_command: Some(Arc::clone(&light_cells.color_mode_command)),
            supported_color_modes: vec![ColorMode::ColorTemperature, ColorMode::Rgb],
            brightness: Some(Arc::clone(&light_cells.brightness)),
            brightness_command: Some(Arc::clone(&light_cells.brightness_command)),
            brightness_scale: 100,
            color_temperature: Some(Arc::clone(&light_cells.color_temperature)),
            color_temperature_command: Some(Arc::clone(&light_cells.color_temperature_command)),
            color_temperature_in_kelvin: true,
            max_kelvin: 9000,
            min_kelvin: 2000,
            rgb: Some(Arc::clone(&light_cells.rgb)),
            rgb_command: Some(Arc::clone(&light_cells.rgb_command)),
            ..Light::default()
        };

        let mut light = Component::new(
            "example.lamp",
            join_topic([config.topic_prefix.as_str(), "lamp"]),
            Arc::clone(&light_cells.availability),
            platform,
        )
        .with_name("Lamp");
        light.default_entity_id = "light.lamp".to_string();
        light.icon = "mdi:lightbulb".to_string();
        light.write_options = WriteOptions::retained();

        let presence_cells = PresenceCells {
            availability: availability(),
            state: power_state(),
        };
        let mut presence = Component::new(
            "example.lamp.pir",
            join_topic([config.topic_prefix.as_str(), "lamp_pir"]),
            Arc::clone(&presence_cells.availability),
            BinarySensor::new(
                Arc::clone(&presence_cells.state),
                Some(Arc::new(sensor_attributes("attributes"))),
            ),
        )
        .with_name("Lamp Presence");
        presence.default_entity_id = "binary_sensor.lamp_pir".to_string();
        presence.icon = "mdi:motion-sensor".to_string();

        let device = Device {
            name: config.device_name.clone(),
            identifiers: vec![join_topic([config.topic_prefix.as_str(), "fake_light"])],
            ..Device::default()
        };

        Self {
            device,
            discovery_prefix: config.discovery_prefix.clone(),
            light,
            presence,
            light_cells,
            presence_cells,
        }
    }

    /// Wait for Home Assistant, announce the device and serve commands until
    /// `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Returns error if subscribing or the initial announcement fails.
    pub async fn run<T>(
        mut self,
        manager: Arc<SubscriptionManager<T>>,
        shutdown: CancellationToken,
    ) -> Result<()>
    where
        T: Transport + 'static,
    {
        let home_assistant = Arc::new(home_assistant_availability(&self.discovery_prefix));

        // Watch before subscribing: a retained status can arrive as soon as
        // the subscription is in place.
        let (online_tx, mut online_rx) = watch::channel(false);
        let online = home_assistant.watch(move |status: &Availability| {
            if *status == Availability::ONLINE {
                online_tx.send_replace(true);
            }
        });

        let subscribed = manager
            .subscribe(
                Arc::clone(&home_assistant) as Arc<dyn Handler>,
                home_assistant.subscription("").into_iter().collect(),
            )
            .await;
        if let Err(err) = subscribed {
            home_assistant.unwatch(online);
            return Err(err).context("Failed to subscribe to Home Assistant availability");
        }

        tracing::info!(topic = %home_assistant.topic(), "Waiting for Home Assistant");
        let available = tokio::select! {
            biased;
            ready = online_rx.wait_for(|online| *online) => ready.is_ok(),
            () = shutdown.cancelled() => false,
        };
        home_assistant.unwatch(online);
        if !available {
            return Ok(());
        }
        tracing::info!("Home Assistant is now available");

        self.light
            .subscribe(manager.as_ref())
            .await
            .context("Failed to subscribe light")?;
        self.presence
            .subscribe(manager.as_ref())
            .await
            .context("Failed to subscribe presence sensor")?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        self.watch_commands(&tx, &home_assistant);

        self.rediscover(manager.as_ref())
            .await
            .context("Failed to send discovery")?;
        self.republish(manager.as_ref())
            .await
            .context("Failed to publish state")?;

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                Some(command) = rx.recv() => self.handle(manager.as_ref(), command).await,
            }
        }

        self.goodbye(manager.as_ref()).await;
        Ok(())
    }

    fn watch_commands(
        &self,
        tx: &mpsc::UnboundedSender<Command>,
        home_assistant: &RemoteValue<Availability>,
    ) {
        fn forward<V: Clone + Send + Sync + 'static>(
            cell: &RemoteValue<V>,
            tx: &mpsc::UnboundedSender<Command>,
            wrap: fn(V) -> Command,
        ) {
            let tx = tx.clone();
            // The receiver only goes away during shutdown.
            cell.watch(move |value: &V| {
                let _ = tx.send(wrap(value.clone()));
            });
        }

        let cells = &self.light_cells;
        forward(&cells.command, tx, Command::Power);
        forward(&cells.color_mode_command, tx, Command::ColorMode);
        forward(&cells.brightness_command, tx, Command::Brightness);
        forward(&cells.color_temperature_command, tx, Command::ColorTemperature);
        forward(&cells.rgb_command, tx, Command::Rgb);
        forward(home_assistant, tx, Command::HomeAssistant);
    }

    async fn handle(&self, writer: &dyn Writer, command: Command) {
        let result = match command {
            Command::HomeAssistant(availability) => {
                tracing::info!(%availability, "Home Assistant state changed");
                if availability != Availability::ONLINE {
                    return;
                }
                if let Err(err) = self.rediscover(writer).await {
                    tracing::error!(error = %err, "Failed to re-send discovery info");
                }
                self.republish(writer).await
            }
            command => self.mirror(writer, command).await,
        };

        if let Err(err) = result {
            tracing::error!(error = %err, "Failed to publish state");
        }
    }

    async fn mirror(&self, writer: &dyn Writer, command: Command) -> Result<(), ValueError> {
        let cells = &self.light_cells;
        let prefix = self.light.topic_prefix.as_str();

        match command {
            Command::Power(state) => {
                tracing::info!(%state, "Home Assistant sent light command");
                cells.state.write(writer, prefix, state).await?;
            }
            Command::ColorMode(mode) => {
                tracing::info!(%mode, "Home Assistant set color mode");
                cells.color_mode.write(writer, prefix, mode).await?;
            }
            Command::Brightness(brightness) => {
                tracing::info!(brightness, "Home Assistant set brightness");
                cells.brightness.write(writer, prefix, brightness).await?;
            }
            Command::ColorTemperature(kelvin) => {
                tracing::info!(kelvin, "Home Assistant set color temperature");
                cells.color_temperature.write(writer, prefix, kelvin).await?;
                cells
                    .color_mode
                    .write(writer, prefix, ColorMode::ColorTemperature)
                    .await?;
            }
            Command::Rgb(rgb) => {
                tracing::info!(%rgb, "Home Assistant set color");
                cells.rgb.write(writer, prefix, rgb).await?;
                cells.color_mode.write(writer, prefix, ColorMode::Rgb).await?;
            }
            Command::HomeAssistant(_) => {}
        }
        Ok(())
    }

    fn components(&self) -> Components<'_> {
        let mut components = Components::new();
        components.insert(self.light.unique_id.clone(), &self.light);
        components.insert(self.presence.unique_id.clone(), &self.presence);
        components
    }

    async fn rediscover(&self, writer: &dyn Writer) -> Result<(), DiscoveryError> {
        tracing::info!("Re-sending discovery info");
        self.device
            .configure(writer, &self.discovery_prefix, &self.components())
            .await
    }

    async fn republish(&self, writer: &dyn Writer) -> Result<(), ValueError> {
        tracing::info!("Republishing state/availability");
        self.write_all(writer, Availability::ONLINE, true).await
    }

    /// Mark both entities unavailable before disconnecting.
    async fn goodbye(&self, writer: &dyn Writer) {
        if let Err(err) = self.write_all(writer, Availability::OFFLINE, false).await {
            tracing::warn!(error = %err, "Failed to mark device unavailable");
        }
    }

    /// Write availability to both components and, with `reset_state`, turn both off.
    ///
    /// Every write is attempted; the first error is returned.
    async fn write_all(
        &self,
        writer: &dyn Writer,
        availability: Availability,
        reset_state: bool,
    ) -> Result<(), ValueError> {
        let light_prefix = self.light.topic_prefix.as_str();
        let presence_prefix = self.presence.topic_prefix.as_str();

        let mut results = Vec::with_capacity(4);
        if reset_state {
            results.push(
                self.light_cells
                    .state
                    .write(writer, light_prefix, PowerState::OFF)
                    .await
                    .map(drop),
            );
            results.push(
                self.presence_cells
                    .state
                    .write(writer, presence_prefix, PowerState::OFF)
                    .await
                    .map(drop),
            );
        }
        results.push(
            self.light_cells
                .availability
                .write(writer, light_prefix, availability.clone())
                .await
                .map(drop),
        );
        results.push(
            self.presence_cells
                .availability
                .write(writer, presence_prefix, availability)
                .await
                .map(drop),
        );

        results.into_iter().collect()
    }
}
