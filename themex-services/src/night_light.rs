// SPDX-License-Identifier: LGPL-3.0-only
//! Night Light status from the GNOME Settings Daemon over D-Bus.

use smol::stream::StreamExt;

#[zbus::proxy(
    interface = "org.gnome.SettingsDaemon.Color",
    default_service = "org.gnome.SettingsDaemon.Color",
    default_path = "/org/gnome/SettingsDaemon/Color"
)]
trait Color {
    /// Whether Night Light is currently shifting the display colors.
    #[zbus(property)]
    fn night_light_active(&self) -> zbus::Result<bool>;
}

/// Connection to the settings daemon's color plugin.
pub struct NightLight {
    proxy: ColorProxy<'static>,
}

impl NightLight {
    /// Connect on the session bus.
    pub async fn connect() -> zbus::Result<Self> {
        let connection = zbus::Connection::session().await?;
        let proxy = ColorProxy::new(&connection).await?;
        Ok(Self { proxy })
    }

    /// Current Night Light status.
    pub async fn is_active(&self) -> zbus::Result<bool> {
        self.proxy.night_light_active().await
    }

    /// Report the current status, then every change, to `on_change`.
    ///
    /// Runs until the daemon goes away.
    pub async fn follow<F>(&self, on_change: F) -> zbus::Result<()>
    where
        F: Fn(bool),
    {
        on_change(self.is_active().await?);

        let mut changes = self.proxy.receive_night_light_active_changed().await;
        while let Some(change) = changes.next().await {
            match change.get().await {
                Ok(active) => {
                    log::debug!("Night Light active: {}", active);
                    on_change(active);
                },
                Err(e) => log::warn!("Failed to read Night Light status: {}", e),
            }
        }
        Ok(())
    }
}
